//! Client for the Anthropic Messages API.
//!
//! Supports both request forms against `/v1/messages`: a plain call
//! that parses the full response body, and a `stream: true` call that
//! decodes SSE events into text fragments. Only `content_block_delta`
//! events carry text; everything else is bookkeeping or an error.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use vitae_core::{CompletionConfig, Result, VitaeError};

use crate::completion::{ChatMessage, CompletionProvider, CompletionStream, Role, SseLineBuffer};

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Client for Anthropic's Messages API.
///
/// # Examples
///
/// ```
/// use vitae_core::CompletionConfig;
/// use vitae_chat::anthropic::AnthropicClient;
/// use vitae_chat::completion::CompletionProvider;
///
/// let config = CompletionConfig {
///     api_key: Some("test-key".into()),
///     ..CompletionConfig::default()
/// };
/// let client = AnthropicClient::with_config(&config).unwrap();
/// assert_eq!(client.model(), "claude-sonnet-4-5-20250929");
/// ```
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

/// Server-sent events from the Messages API. Event types this client
/// does not act on parse as `Other` and are dropped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl AnthropicClient {
    /// Create a client from a [`CompletionConfig`].
    ///
    /// Falls back to the `ANTHROPIC_API_KEY` env var if no key is in
    /// the config.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Config`] if no API key is available and
    /// [`VitaeError::Provider`] if the HTTP client cannot be built.
    pub fn with_config(config: &CompletionConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .ok_or_else(|| {
                VitaeError::Config(
                    "completion API key not found: set completion.api_key in vitae.toml or the ANTHROPIC_API_KEY env var".into(),
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
                .unwrap_or_else(|| ANTHROPIC_BASE_URL.to_string()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_request(
        &self,
        system_prompt: &str,
        user_message: &str,
        stream: bool,
    ) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system_prompt.to_string(),
            messages: vec![ChatMessage {
                role: Role::User,
                content: user_message.to_string(),
            }],
            stream,
        }
    }

    fn post_messages(&self, request: &MessagesRequest) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.clone())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let response = self
            .post_messages(&self.build_request(system_prompt, user_message, false))
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

        let text = body
            .get("content")
            .and_then(|content| content.get(0))
            .and_then(|block| block.get("text"))
            .and_then(|text| text.as_str())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| {
                VitaeError::Provider(format!("unexpected completion response structure: {body}"))
            })?;

        Ok(text.to_string())
    }

    async fn stream_complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<CompletionStream> {
        let request = self.post_messages(&self.build_request(system_prompt, user_message, true));

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
                    match serde_json::from_str::<StreamEvent>(&payload) {
                        Ok(StreamEvent::ContentBlockDelta {
                            delta: Delta::TextDelta { text },
                        }) => yield text,
                        Ok(StreamEvent::Error { error }) => {
                            Err(VitaeError::Provider(format!(
                                "completion stream error: {}",
                                error.message
                            )))?;
                        }
                        Ok(StreamEvent::MessageStop) => return,
                        _ => {}
                    }
                }
            }
        });

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config(base_url: Option<String>) -> CompletionConfig {
        CompletionConfig {
            api_key: Some("test-key".into()),
            base_url,
            ..CompletionConfig::default()
        }
    }

    async fn collect(mut stream: CompletionStream) -> Result<String> {
        let mut out = String::new();
        while let Some(fragment) = stream.next().await {
            out.push_str(&fragment?);
        }
        Ok(out)
    }

    #[test]
    fn request_carries_system_and_streaming_flag() {
        let client = AnthropicClient::with_config(&test_config(None)).unwrap();
        let request = client.build_request("be yourself", "where do you work?", true);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-sonnet-4-5-20250929");
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["system"], "be yourself");
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "where do you work?");

        let plain = client.build_request("be yourself", "where do you work?", false);
        let json = serde_json::to_value(&plain).unwrap();
        assert_eq!(json["stream"], false);
    }

    #[test]
    fn text_delta_event_parses() {
        let payload = r#"{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        let event: StreamEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            event,
            StreamEvent::ContentBlockDelta {
                delta: Delta::TextDelta { ref text }
            } if text == "Hi"
        ));
    }

    #[test]
    fn unknown_event_types_parse_as_other() {
        let payload = r#"{"type":"message_start","message":{"id":"msg_1"}}"#;
        let event: StreamEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(event, StreamEvent::Other));
    }

    #[test]
    fn error_event_carries_the_message() {
        let payload = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        let event: StreamEvent = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            event,
            StreamEvent::Error { ref error } if error.message == "Overloaded"
        ));
    }

    #[test]
    fn missing_api_key_gives_clear_error() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        let config = CompletionConfig {
            api_key: None,
            ..CompletionConfig::default()
        };
        let err = AnthropicClient::with_config(&config).unwrap_err();
        assert!(err.to_string().contains("API key"));
    }

    #[tokio::test]
    async fn streams_text_fragments_in_order() {
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n",
            "\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n",
            "\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" world\"}}\n",
            "\n",
            "data: {\"type\":\"message_stop\"}\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let stream = client.stream_complete("system", "question").await.unwrap();
        let answer = collect(stream).await.unwrap();

        assert_eq!(answer, "Hello world");
    }

    #[tokio::test]
    async fn complete_returns_the_full_text() {
        let body = serde_json::json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "I work at My Company."}],
            "stop_reason": "end_turn"
        });

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&server)
            .await;

        let client = AnthropicClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let answer = client.complete("system", "question").await.unwrap();

        assert_eq!(answer, "I work at My Company.");
    }

    #[tokio::test]
    async fn complete_rejects_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": []
            })))
            .mount(&server)
            .await;

        let client = AnthropicClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let err = client.complete("system", "question").await.unwrap_err();

        assert!(err.to_string().contains("unexpected completion response"));
    }

    #[tokio::test]
    async fn http_error_surfaces_as_first_stream_item() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let client = AnthropicClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let mut stream = client.stream_complete("system", "question").await.unwrap();

        let first = stream.next().await.unwrap();
        let err = first.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("529"), "missing status: {message}");
        assert!(message.contains("overloaded"), "missing body: {message}");
        assert!(stream.next().await.is_none(), "error must end the stream");
    }

    #[tokio::test]
    async fn in_stream_error_event_fails_the_stream() {
        let body = concat!(
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"partial\"}}\n",
            "\n",
            "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n",
        );

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = AnthropicClient::with_config(&test_config(Some(server.uri()))).unwrap();
        let mut stream = client.stream_complete("system", "question").await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("Overloaded"));
    }
}
