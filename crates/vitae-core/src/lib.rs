//! Core types, configuration, and error handling for the vitae pipeline.
//!
//! This crate provides the shared foundation used by the other vitae crates:
//! - [`VitaeError`] — unified error type using `thiserror`
//! - [`VitaeConfig`] — configuration loaded from `vitae.toml`
//! - [`ProfileDocument`] — the structured profile the pipeline answers
//!   questions about, with its section records

mod config;
mod error;
mod profile;

pub use config::{CompletionConfig, EmbeddingConfig, RetrievalConfig, VitaeConfig};
pub use error::VitaeError;
pub use profile::{
    Certification, Education, Experience, Language, PersonalInfo, ProfileDocument, Project, Skills,
};

/// A convenience `Result` type for vitae operations.
pub type Result<T> = std::result::Result<T, VitaeError>;
