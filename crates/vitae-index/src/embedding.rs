//! Embedding provider abstraction and HTTP client.
//!
//! [`EmbeddingProvider`] is the seam the rest of the pipeline depends on;
//! [`EmbeddingClient`] implements it against the Voyage AI or OpenAI
//! embeddings API, selected by `embedding.provider` in the config.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vitae_core::{EmbeddingConfig, Result, VitaeError};

const VOYAGE_BASE_URL: &str = "https://api.voyageai.com/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const BATCH_SIZE: usize = 64;
const BATCH_DELAY_MS: u64 = 200;

/// Turns text into fixed-dimensionality vectors.
///
/// Implementations must return vectors of exactly [`dimensions`] length,
/// in the same order as their inputs.
///
/// [`dimensions`]: EmbeddingProvider::dimensions
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Dimensionality of the vectors this provider produces.
    fn dimensions(&self) -> usize;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if the backend call fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of texts. Returns vectors in input order; an empty
    /// input yields an empty output without touching the backend.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if the backend call fails or
    /// returns a different number of vectors than inputs.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// HTTP client for the Voyage AI and OpenAI embeddings APIs.
///
/// Both expose the same `POST /embeddings` shape, so one client covers
/// both; the provider choice only selects the base URL and the env var
/// consulted for the API key.
///
/// # Examples
///
/// ```
/// use vitae_core::EmbeddingConfig;
/// use vitae_index::embedding::{EmbeddingClient, EmbeddingProvider};
///
/// let config = EmbeddingConfig {
///     api_key: Some("test-key".into()),
///     ..EmbeddingConfig::default()
/// };
/// let client = EmbeddingClient::with_config(&config).unwrap();
/// assert_eq!(client.model(), "voyage-3");
/// assert_eq!(client.dimensions(), 1024);
/// ```
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl std::fmt::Debug for EmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDataItem>,
}

#[derive(Deserialize)]
struct EmbedDataItem {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    /// Create a client from an [`EmbeddingConfig`].
    ///
    /// Falls back to the `VOYAGE_API_KEY` or `OPENAI_API_KEY` env var
    /// (matching the configured provider) if no key is in the config.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Config`] if the provider name is not
    /// recognized or no API key is available.
    pub fn with_config(config: &EmbeddingConfig) -> Result<Self> {
        let (default_base_url, env_var) = match config.provider.as_str() {
            "voyage" => (VOYAGE_BASE_URL, "VOYAGE_API_KEY"),
            "openai" => (OPENAI_BASE_URL, "OPENAI_API_KEY"),
            other => {
                return Err(VitaeError::Config(format!(
                    "unknown embedding provider '{other}': expected \"voyage\" or \"openai\""
                )))
            }
        };

        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(env_var).ok())
            .ok_or_else(|| {
                VitaeError::Config(format!(
                    "embedding API key not found: set embedding.api_key in vitae.toml or the {env_var} env var"
                ))
            })?;

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    async fn request_embeddings(&self, input: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            input: input.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| VitaeError::Provider(format!("embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".into());
            return Err(VitaeError::Provider(format!(
                "embedding API returned {status}: {body}"
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| VitaeError::Provider(format!("failed to parse embedding response: {e}")))?;

        if embed_response.data.len() != input.len() {
            return Err(VitaeError::Provider(format!(
                "embedding API returned {} vectors for {} inputs",
                embed_response.data.len(),
                input.len()
            )));
        }

        Ok(embed_response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }

    /// Build the JSON request body for an embed call (for testing).
    #[cfg(test)]
    fn build_request(&self, texts: &[String]) -> EmbedRequest {
        EmbedRequest {
            model: self.model.clone(),
            input: texts.to_vec(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let vectors = self.request_embeddings(&[text.to_string()]).await?;
        vectors.into_iter().next().ok_or_else(|| {
            VitaeError::Provider("embedding API returned no vector for query".into())
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::debug!(count = texts.len(), model = %self.model, "embedding batch");

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for (i, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            if i > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(BATCH_DELAY_MS)).await;
            }
            all_embeddings.extend(self.request_embeddings(batch).await?);
        }

        Ok(all_embeddings)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config(base_url: Option<String>) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("test-key".into()),
            base_url,
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn request_body_is_model_and_input_only() {
        let client = EmbeddingClient::with_config(&test_config(None)).unwrap();
        let texts = vec!["first passage".to_string(), "second passage".to_string()];
        let request = client.build_request(&texts);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "voyage-3");
        assert_eq!(json["input"].as_array().unwrap().len(), 2);
        assert!(json.get("input_type").is_none());
    }

    #[test]
    fn response_parsing_works() {
        let json = r#"{
            "data": [
                {"embedding": [0.1, 0.2, 0.3]},
                {"embedding": [0.4, 0.5, 0.6]}
            ]
        }"#;
        let response: EmbedResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].embedding, vec![0.1, 0.2, 0.3]);
        assert_eq!(response.data[1].embedding, vec![0.4, 0.5, 0.6]);
    }

    #[test]
    fn batch_splitting_calculates_correctly() {
        let n = 150;
        let texts: Vec<String> = (0..n).map(|i| format!("text {i}")).collect();
        let batches: Vec<&[String]> = texts.chunks(BATCH_SIZE).collect();
        assert_eq!(batches.len(), 3); // 64 + 64 + 22
        assert_eq!(batches[0].len(), 64);
        assert_eq!(batches[1].len(), 64);
        assert_eq!(batches[2].len(), 22);
    }

    #[test]
    fn unknown_provider_is_config_error() {
        let config = EmbeddingConfig {
            provider: "cohere".into(),
            api_key: Some("key".into()),
            ..EmbeddingConfig::default()
        };
        let err = EmbeddingClient::with_config(&config).unwrap_err();
        assert!(err.to_string().contains("unknown embedding provider"));
    }

    #[test]
    fn missing_api_key_gives_clear_error() {
        std::env::remove_var("VOYAGE_API_KEY");
        let config = EmbeddingConfig {
            api_key: None,
            ..EmbeddingConfig::default()
        };
        let err = EmbeddingClient::with_config(&config).unwrap_err();
        assert!(
            err.to_string().contains("API key"),
            "error should mention API key: {err}"
        );
    }

    #[test]
    fn openai_provider_targets_openai_endpoint() {
        let config = EmbeddingConfig {
            provider: "openai".into(),
            api_key: Some("key".into()),
            model: "text-embedding-3-small".into(),
            ..EmbeddingConfig::default()
        };
        let client = EmbeddingClient::with_config(&config).unwrap();
        assert!(format!("{client:?}").contains("api.openai.com"));
    }

    #[tokio::test]
    async fn embed_batch_posts_bearer_auth_and_parses_vectors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [1.0, 0.0]},
                    {"embedding": [0.0, 1.0]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EmbeddingClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let vectors = client.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 0.0]);
        assert_eq!(vectors[1], vec![0.0, 1.0]);
    }

    #[tokio::test]
    async fn embed_returns_the_single_vector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.5, 0.5, 0.5]}]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let vector = client.embed("where does she work?").await.unwrap();
        assert_eq!(vector, vec![0.5, 0.5, 0.5]);
    }

    #[tokio::test]
    async fn short_embedding_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [1.0]}]
            })))
            .mount(&server)
            .await;

        let client = EmbeddingClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let err = client.embed_batch(&texts).await.unwrap_err();
        assert!(
            err.to_string().contains("1 vectors for 2 inputs"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn api_error_status_surfaces_in_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = EmbeddingClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let err = client.embed("question").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"), "missing status: {message}");
        assert!(message.contains("rate limited"), "missing body: {message}");
    }

    #[tokio::test]
    async fn empty_batch_skips_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = EmbeddingClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let vectors = client.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }
}
