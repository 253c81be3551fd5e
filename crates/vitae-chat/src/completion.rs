//! Completion provider abstraction and streaming plumbing.
//!
//! [`CompletionProvider`] is the seam the pipeline talks to;
//! [`AnthropicClient`] and [`OpenAiClient`] implement it over their
//! respective streaming HTTP APIs. Fragments flow through a
//! [`CompletionStream`]; dropping the stream abandons the request.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use vitae_core::{CompletionConfig, Result, VitaeError};

use crate::anthropic::AnthropicClient;
use crate::openai::OpenAiClient;

/// A stream of completion text fragments, in generation order.
///
/// An `Err` item ends the useful life of the stream; callers should
/// stop polling after seeing one.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Produces completions for a system prompt and user message, either
/// as one value or as a live stream of fragments.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Request the full completion as a single value.
    ///
    /// The default implementation drains
    /// [`stream_complete`](Self::stream_complete); HTTP clients
    /// override it with a non-streaming request.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if the backend call fails.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String> {
        let mut stream = self.stream_complete(system_prompt, user_message).await?;
        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    /// Start a streamed completion.
    ///
    /// The request is made lazily when the stream is first polled, so
    /// transport and API failures arrive as the first stream item
    /// rather than from this call.
    ///
    /// # Errors
    ///
    /// Returns [`VitaeError::Provider`] if the request cannot be
    /// constructed at all.
    async fn stream_complete(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<CompletionStream>;
}

/// Build the completion provider named in the config.
///
/// # Errors
///
/// Returns [`VitaeError::Config`] for an unknown provider name or a
/// missing API key.
///
/// # Examples
///
/// ```
/// use vitae_core::CompletionConfig;
/// use vitae_chat::completion::provider_from_config;
///
/// let config = CompletionConfig {
///     api_key: Some("test-key".into()),
///     ..CompletionConfig::default()
/// };
/// let provider = provider_from_config(&config).unwrap();
/// assert_eq!(provider.model(), "claude-sonnet-4-5-20250929");
/// ```
pub fn provider_from_config(config: &CompletionConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicClient::with_config(config)?)),
        "openai" => Ok(Arc::new(OpenAiClient::with_config(config)?)),
        other => Err(VitaeError::Config(format!(
            "unknown completion provider '{other}': expected \"anthropic\" or \"openai\""
        ))),
    }
}

/// A message in a chat conversation.
///
/// # Examples
///
/// ```
/// use vitae_chat::completion::{ChatMessage, Role};
///
/// let msg = ChatMessage {
///     role: Role::User,
///     content: "Where do you work?".into(),
/// };
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    pub content: String,
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use vitae_chat::completion::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// Incremental SSE line buffer.
///
/// Transport chunks go in; the payloads of any completed `data:` lines
/// come out. Partial lines are held until the next chunk completes
/// them, and non-data lines (`event:`, comments, blanks) are dropped.
/// Chunks are buffered as raw bytes and only complete lines are
/// decoded, so a multi-byte character split across transport chunks
/// reassembles intact.
pub(crate) struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub(crate) fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}
