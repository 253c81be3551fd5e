//! Prompt assembly for grounded and degraded answers.
//!
//! The system prompt puts the model in the profile owner's shoes; the
//! grounded variant embeds the retrieved passages, the fallback variant
//! is used when retrieval found nothing.

use vitae_core::ProfileDocument;
use vitae_index::store::SearchHit;

const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

const GROUNDED_RULES: &str = "\
Rules:
- Answer in the same language as the question.
- Speak in the first person; this is your own background.
- Only use the profile information above; do not invent details.
- If the information above does not cover the question, say so plainly.
- Keep answers to two or three paragraphs at most.";

/// One-line persona identity used in every system prompt.
///
/// # Examples
///
/// ```
/// use vitae_core::ProfileDocument;
/// use vitae_chat::prompt::persona_line;
///
/// let json = r#"{"personalInfo": {"name": "Ada", "title": "Architect", "company": "Acme"}}"#;
/// let profile = ProfileDocument::from_json(json).unwrap();
/// assert_eq!(
///     persona_line(&profile),
///     "You are Ada, Architect at Acme. You answer questions about your own professional background."
/// );
/// ```
pub fn persona_line(profile: &ProfileDocument) -> String {
    let info = &profile.personal_info;
    format!(
        "You are {}, {} at {}. You answer questions about your own professional background.",
        info.name, info.title, info.company
    )
}

/// Render retrieved passages as a scored context block.
///
/// Every passage is prefixed with its similarity score at three
/// decimals and separated from the next by a `---` divider.
pub fn context_block(hits: &[SearchHit]) -> String {
    let entries: Vec<String> = hits
        .iter()
        .map(|hit| format!("[Score: {:.3}] {}", hit.score, hit.chunk.text))
        .collect();
    entries.join(CONTEXT_SEPARATOR)
}

/// Build the system prompt used when retrieval produced context.
pub fn grounded_system_prompt(profile: &ProfileDocument, hits: &[SearchHit]) -> String {
    format!(
        "{}\n\nHere is the relevant information from your profile:\n\n{}\n\n{}",
        persona_line(profile),
        context_block(hits),
        GROUNDED_RULES
    )
}

/// Build the system prompt used when retrieval found nothing.
pub fn fallback_system_prompt(profile: &ProfileDocument) -> String {
    format!(
        "{}\n\nNo indexed profile information matched this question. Answer briefly in the \
         first person, in the same language as the question, and say plainly when a detail \
         is not part of your profile.",
        persona_line(profile)
    )
}

/// Annotate the user's question so the model knows retrieval came up
/// empty.
///
/// # Examples
///
/// ```
/// use vitae_chat::prompt::fallback_user_message;
///
/// let message = fallback_user_message("What is your shoe size?");
/// assert!(message.starts_with("What is your shoe size?"));
/// assert!(message.contains("no matching information"));
/// ```
pub fn fallback_user_message(question: &str) -> String {
    format!(
        "{question}\n\n(Note: no matching information was found in the profile for this question)"
    )
}
