//! Client for OpenAI-compatible chat completions.
//!
//! Works with any backend exposing the `/chat/completions` endpoint.
//! Plain requests parse `choices[0].message.content` out of the
//! response; `stream: true` requests read deltas from SSE chunks until
//! a `finish_reason` of `stop` or the `[DONE]` sentinel.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use vitae_core::{CompletionConfig, Result, VitaeError};

use crate::completion::{ChatMessage, CompletionProvider, CompletionStream, Role, SseLineBuffer};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DONE_SENTINEL: &str = "[DONE]";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Client for the OpenAI chat completions API.
///
/// # Examples
///
/// ```
/// use vitae_core::CompletionConfig;
/// use vitae_chat::completion::CompletionProvider;
/// use vitae_chat::openai::OpenAiClient;
///
/// let config = CompletionConfig {
///     provider: "openai".into(),
///     api_key: Some("test-key".into()),
///     model: "gpt-4o-mini".into(),
///     ..CompletionConfig::default()
/// };
/// let client = OpenAiClient::with_config(&config).unwrap();
/// assert_eq!(client.model(), "gpt-4o-mini");
/// ```
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: ChoiceDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChoiceDelta {
    content: Option<String>,
}

impl OpenAiClient {
    /// Create a client from a [`CompletionConfig`].
    ///
    /// Falls back to the `OPENAI_API_KEY` env var if no key is in the
    /// config.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Config`] if no API key is available and
    /// [`VitaeError::Provider`] if the HTTP client cannot be built.
    pub fn with_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                VitaeError::Config(
                    "completion API key not found: set completion.api_key in vitae.toml or the OPENAI_API_KEY env var".into(),
                )
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| VitaeError::Provider(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(&self, system_prompt: &str, user_message: &str, stream: bool) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: Role::System,
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: Role::User,
                    content: user_message.to_string(),
                },
            ],
            max_tokens: self.max_tokens,
            stream,
        }
    }

    fn post_chat(&self, request: &ChatRequest) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let response = self
            .post_chat(&self.build_request(system_prompt, user_message, false))
            .send()
            .await
            .map_err(|e| VitaeError::Provider(format!("completion request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VitaeError::Provider(format!(
                "completion API error {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VitaeError::Provider(format!("failed to parse completion response: {e}")))?;

        let content = body
            .get("choices")
            .and_then(|choices| choices.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                VitaeError::Provider(format!("unexpected completion response structure: {body}"))
            })?;

        Ok(content.to_string())
    }

    async fn stream_complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<CompletionStream> {
        let request = self.post_chat(&self.build_request(system_prompt, user_message, true));

        let stream: CompletionStream = Box::pin(try_stream! {
            let response = request
                .send()
                .await
                .map_err(|e| VitaeError::Provider(format!("completion request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                Err(VitaeError::Provider(format!(
                    "completion API error {status}: {body}"
                )))?;
                return;
            }

            let mut lines = SseLineBuffer::new();
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                let chunk = chunk
                    .map_err(|e| VitaeError::Provider(format!("stream transport failed: {e}")))?;
                for payload in lines.feed(&chunk) {
                    if payload == DONE_SENTINEL {
                        return;
                    }
                    let parsed: ChatChunk = match serde_json::from_str(&payload) {
                        Ok(parsed) => parsed,
                        Err(_) => continue,
                    };
                    let mut finished = false;
                    for choice in parsed.choices {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                yield content;
                            }
                        }
                        if choice.finish_reason.as_deref() == Some("stop") {
                            finished = true;
                        }
                    }
                    if finished {
                        return;
                    }
                }
            }
        });

        Ok(stream)
    }
}
