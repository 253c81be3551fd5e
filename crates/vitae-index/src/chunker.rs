//! Profile document chunking into retrievable passages.
//!
//! Splits a structured profile into a flat ordered sequence of text
//! passages, one per semantic section (identity, each experience entry,
//! each education entry, grouped certifications, skills, languages,
//! projects). Each passage carries provenance metadata for filtering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vitae_core::{Certification, Education, Experience, ProfileDocument};

/// Fallback for dates, fields, and issuers missing from the document.
const UNSPECIFIED: &str = "unspecified";

/// A retrievable text passage extracted from a profile document.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vitae_index::chunker::ProfileChunk;
///
/// let chunk = ProfileChunk {
///     id: "chunk-0".into(),
///     text: "Name: Ada Example\nTitle: Architect".into(),
///     metadata: HashMap::from([("type".to_string(), "personal".to_string())]),
/// };
/// assert_eq!(chunk.metadata["type"], "personal");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileChunk {
    /// Id assigned by a monotonic counter scoped to one chunking run
    /// (`chunk-0`, `chunk-1`, ...). Not stable across runs if document
    /// content changes ordering.
    pub id: String,
    /// Human-readable passage text handed to the embedding provider.
    pub text: String,
    /// Provenance tags: a `type` key naming the category, plus
    /// category-specific keys (e.g. `company` for experience).
    pub metadata: HashMap<String, String>,
}

/// Split a profile document into an ordered sequence of passages.
///
/// Deterministic for a given document. The identity passage is always
/// emitted; list sections produce passages only when non-empty.
///
/// # Examples
///
/// ```
/// use vitae_core::ProfileDocument;
/// use vitae_index::chunker::chunk_profile;
///
/// let doc = ProfileDocument::from_json(r#"{"summary": "Engineer."}"#).unwrap();
/// let chunks = chunk_profile(&doc);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].metadata["type"], "personal");
/// ```
pub fn chunk_profile(profile: &ProfileDocument) -> Vec<ProfileChunk> {
    let mut chunks = Vec::new();
    let mut counter = 0usize;

    chunks.push(personal_chunk(profile, &mut counter));

    for entry in &profile.experience {
        chunks.push(experience_chunk(entry, &mut counter));
    }

    for entry in &profile.education {
        chunks.push(education_chunk(entry, &mut counter));
    }

    if !profile.certifications.is_empty() {
        chunks.push(certifications_chunk(&profile.certifications, &mut counter));
    }

    if !profile.skills.technical.is_empty() {
        chunks.push(skills_chunk(
            &profile.skills.technical,
            "technical",
            "Technical skills",
            &mut counter,
        ));
    }

    if !profile.skills.soft.is_empty() {
        chunks.push(skills_chunk(
            &profile.skills.soft,
            "soft",
            "Soft skills",
            &mut counter,
        ));
    }

    if !profile.languages.is_empty() {
        chunks.push(languages_chunk(profile, &mut counter));
    }

    if !profile.projects.is_empty() {
        chunks.push(projects_chunk(profile, &mut counter));
    }

    chunks
}

fn make_chunk(counter: &mut usize, text: String, metadata: HashMap<String, String>) -> ProfileChunk {
    let id = format!("chunk-{counter}");
    *counter += 1;
    ProfileChunk { id, text, metadata }
}

fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn personal_chunk(profile: &ProfileDocument, counter: &mut usize) -> ProfileChunk {
    let info = &profile.personal_info;
    let text = format!(
        "Name: {}\nTitle: {}\nCompany: {}\nLocation: {}\n\nSummary: {}",
        info.name, info.title, info.company, info.location, profile.summary
    );
    make_chunk(
        counter,
        text,
        tags(&[("type", "personal"), ("name", &info.name)]),
    )
}

fn experience_chunk(entry: &Experience, counter: &mut usize) -> ProfileChunk {
    let start = entry.start_date.as_deref().unwrap_or(UNSPECIFIED);
    let end = if entry.current {
        "present"
    } else {
        entry.end_date.as_deref().unwrap_or(UNSPECIFIED)
    };
    let text = format!(
        "Role: {}\nCompany: {}\nLocation: {}\nPeriod: {start} - {end}\nDescription: {}",
        entry.title, entry.company, entry.location, entry.description
    );
    make_chunk(
        counter,
        text,
        tags(&[
            ("type", "experience"),
            ("company", &entry.company),
            ("title", &entry.title),
        ]),
    )
}

fn education_chunk(entry: &Education, counter: &mut usize) -> ProfileChunk {
    let field = entry.field.as_deref().unwrap_or(UNSPECIFIED);
    let text = format!(
        "Institution: {}\nField: {field}\nPeriod: {} - {}\nDescription: {}",
        entry.institution, entry.start_year, entry.end_year, entry.description
    );
    make_chunk(
        counter,
        text,
        tags(&[("type", "education"), ("institution", &entry.institution)]),
    )
}

fn certifications_chunk(certifications: &[Certification], counter: &mut usize) -> ProfileChunk {
    let entries: Vec<String> = certifications
        .iter()
        .map(|cert| {
            let issuer = cert.issuer.as_deref().unwrap_or(UNSPECIFIED);
            format!("- {} ({issuer}) - {}\n  {}", cert.name, cert.date, cert.description)
        })
        .collect();
    let text = format!("Certifications:\n{}", entries.join("\n"));
    make_chunk(counter, text, tags(&[("type", "certifications")]))
}

fn skills_chunk(
    skills: &[String],
    category: &str,
    label: &str,
    counter: &mut usize,
) -> ProfileChunk {
    let text = format!("{label}: {}", skills.join(", "));
    make_chunk(
        counter,
        text,
        tags(&[("type", "skills"), ("category", category)]),
    )
}

fn languages_chunk(profile: &ProfileDocument, counter: &mut usize) -> ProfileChunk {
    let entries: Vec<String> = profile
        .languages
        .iter()
        .map(|lang| format!("- {}: {}", lang.language, lang.proficiency))
        .collect();
    let text = format!("Languages:\n{}", entries.join("\n"));
    make_chunk(counter, text, tags(&[("type", "languages")]))
}

fn projects_chunk(profile: &ProfileDocument, counter: &mut usize) -> ProfileChunk {
    let entries: Vec<String> = profile
        .projects
        .iter()
        .map(|project| format!("- {} ({})\n  {}", project.name, project.url, project.description))
        .collect();
    let text = format!("Projects:\n{}", entries.join("\n"));
    make_chunk(counter, text, tags(&[("type", "projects")]))
}
