/// Errors that can occur across the vitae pipeline.
///
/// Each variant wraps a specific failure domain. Provider failures are
/// surfaced to the caller as-is; nothing in this workspace retries them.
///
/// # Examples
///
/// ```
/// use vitae_core::VitaeError;
///
/// let err = VitaeError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VitaeError {
    /// Embedding or completion backend returned a non-success status or a
    /// malformed payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// A chunk without a usable vector was handed to the index.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A query vector's length differs from the index dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the index was built with.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// The profile document could not be parsed.
    #[error("document load error: {0}")]
    DocumentLoad(String),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
