use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::VitaeError;

/// A structured professional profile, the single document this pipeline
/// answers questions about.
///
/// The document is supplied fully materialized by an external loader and
/// is read-only input to the chunker; nothing in the pipeline mutates it.
/// Every field defaults when absent so partial documents parse.
///
/// # Examples
///
/// ```
/// use vitae_core::ProfileDocument;
///
/// let doc = ProfileDocument::from_json(r#"{"summary": "Engineer."}"#).unwrap();
/// assert_eq!(doc.summary, "Engineer.");
/// assert!(doc.experience.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    /// Identity and contact details.
    #[serde(default)]
    pub personal_info: PersonalInfo,
    /// Narrative summary paragraph.
    #[serde(default)]
    pub summary: String,
    /// Professional experience entries, most relevant first.
    #[serde(default)]
    pub experience: Vec<Experience>,
    /// Education entries.
    #[serde(default)]
    pub education: Vec<Education>,
    /// Certifications held.
    #[serde(default)]
    pub certifications: Vec<Certification>,
    /// Technical and soft skill lists.
    #[serde(default)]
    pub skills: Skills,
    /// Spoken languages with proficiency levels.
    #[serde(default)]
    pub languages: Vec<Language>,
    /// Side projects and publications.
    #[serde(default)]
    pub projects: Vec<Project>,
    /// Personal interests. Carried for page rendering, never chunked.
    #[serde(default)]
    pub interests: Vec<String>,
    /// Free-form document metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ProfileDocument {
    /// Parse a profile document from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::DocumentLoad`] when the JSON is malformed or
    /// does not match the document schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitae_core::ProfileDocument;
    ///
    /// let err = ProfileDocument::from_json("not json").unwrap_err();
    /// assert!(err.to_string().contains("document load"));
    /// ```
    pub fn from_json(content: &str) -> Result<Self, VitaeError> {
        serde_json::from_str(content)
            .map_err(|e| VitaeError::DocumentLoad(format!("invalid profile JSON: {e}")))
    }
}

/// Identity and contact block of a profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    /// Full name of the profile subject.
    #[serde(default)]
    pub name: String,
    /// Current role title.
    #[serde(default)]
    pub title: String,
    /// Current employer.
    #[serde(default)]
    pub company: String,
    /// City / country.
    #[serde(default)]
    pub location: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Personal website URL.
    #[serde(default)]
    pub website: String,
}

/// One professional experience entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    /// Role title.
    #[serde(default)]
    pub title: String,
    /// Employer name.
    #[serde(default)]
    pub company: String,
    /// Work location.
    #[serde(default)]
    pub location: String,
    /// Whether this is the current position.
    #[serde(default)]
    pub current: bool,
    /// Start date as free-form text (e.g. `"Jan 2020"`).
    pub start_date: Option<String>,
    /// End date as free-form text; irrelevant when `current` is set.
    pub end_date: Option<String>,
    /// What the role involved.
    #[serde(default)]
    pub description: String,
}

/// One education entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    /// Institution name.
    #[serde(default)]
    pub institution: String,
    /// Degree obtained.
    #[serde(default)]
    pub degree: String,
    /// Field of study, when recorded.
    pub field: Option<String>,
    /// First year of attendance.
    #[serde(default)]
    pub start_year: i32,
    /// Final year of attendance.
    #[serde(default)]
    pub end_year: i32,
    /// Notes about the curriculum.
    #[serde(default)]
    pub description: String,
}

/// One certification entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    /// Certification name.
    #[serde(default)]
    pub name: String,
    /// Issuing organization, when recorded.
    pub issuer: Option<String>,
    /// Issue date as free-form text.
    #[serde(default)]
    pub date: String,
    /// What the certification covers.
    #[serde(default)]
    pub description: String,
}

/// Skill lists, split the way profile sites present them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skills {
    /// Technical skills (tools, platforms, languages).
    #[serde(default)]
    pub technical: Vec<String>,
    /// Soft skills.
    #[serde(default)]
    pub soft: Vec<String>,
}

/// A spoken language and its proficiency level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// Language name.
    #[serde(default)]
    pub language: String,
    /// Proficiency (e.g. `"native"`, `"fluent"`).
    #[serde(default)]
    pub proficiency: String,
}

/// A side project or publication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Project URL.
    #[serde(default)]
    pub url: String,
    /// What the project does.
    #[serde(default)]
    pub description: String,
}
