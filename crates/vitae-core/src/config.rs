use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::VitaeError;

/// Top-level configuration loaded from `vitae.toml`.
///
/// Every field has a default matching the hosted setup: Voyage AI
/// embeddings at 1024 dimensions, Anthropic completions, top-5 retrieval.
///
/// # Examples
///
/// ```
/// use vitae_core::VitaeConfig;
///
/// let config = VitaeConfig::default();
/// assert_eq!(config.embedding.provider, "voyage");
/// assert_eq!(config.retrieval.top_k, 5);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitaeConfig {
    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Completion provider settings.
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Retrieval behavior settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl VitaeConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Io`] if the file cannot be read, or
    /// [`VitaeError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vitae_core::VitaeConfig;
    /// use std::path::Path;
    ///
    /// let config = VitaeConfig::from_file(Path::new("vitae.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, VitaeError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use vitae_core::VitaeConfig;
    ///
    /// let toml = r#"
    /// [retrieval]
    /// top_k = 3
    /// "#;
    /// let config = VitaeConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.retrieval.top_k, 3);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VitaeError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Configuration for the embedding provider.
///
/// # Examples
///
/// ```
/// use vitae_core::EmbeddingConfig;
///
/// let config = EmbeddingConfig::default();
/// assert_eq!(config.model, "voyage-3");
/// assert_eq!(config.dimensions, 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding provider (`"voyage"` or `"openai"`, default: `"voyage"`).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    /// API key; falls back to the provider's env var when unset.
    pub api_key: Option<String>,
    /// Model name (default: `"voyage-3"`).
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (default: 1024).
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

fn default_embedding_provider() -> String {
    "voyage".into()
}

fn default_embedding_model() -> String {
    "voyage-3".into()
}

fn default_embedding_dimensions() -> usize {
    1024
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            base_url: None,
        }
    }
}

/// Configuration for the completion provider.
///
/// # Examples
///
/// ```
/// use vitae_core::CompletionConfig;
///
/// let config = CompletionConfig::default();
/// assert_eq!(config.provider, "anthropic");
/// assert_eq!(config.max_tokens, 4096);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Completion provider (`"anthropic"` or `"openai"`, default:
    /// `"anthropic"`).
    #[serde(default = "default_completion_provider")]
    pub provider: String,
    /// API key; falls back to the provider's env var when unset.
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_completion_model")]
    pub model: String,
    /// Maximum output tokens per completion (default: 4096).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
}

fn default_completion_provider() -> String {
    "anthropic".into()
}

fn default_completion_model() -> String {
    "claude-sonnet-4-5-20250929".into()
}

fn default_max_tokens() -> u32 {
    4096
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_completion_provider(),
            api_key: None,
            model: default_completion_model(),
            max_tokens: default_max_tokens(),
            base_url: None,
        }
    }
}

/// Retrieval behavior configuration.
///
/// # Examples
///
/// ```
/// use vitae_core::RetrievalConfig;
///
/// let config = RetrievalConfig::default();
/// assert_eq!(config.top_k, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of passages to retrieve per query (default: 5).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    5
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}
