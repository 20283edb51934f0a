//! Language-model completion API.
//!
//! # Architecture
//!
//! - [`AskAsync`]: the seam the Selector talks to (one system prompt, one user message)
//! - [`AnthropicClient`]: implementation on top of the Anthropic Messages API
//!
//! There is no retry layer: a failed call fails the stage and the scheduler
//! reports the run as failed.

use crate::error::SelectionError;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Trait for async LLM interaction.
///
/// Implementors send a system prompt and a single user message and return
/// the model's text reply.
pub trait AskAsync {
    /// Name of the model answering, recorded in the selection artifact.
    fn model(&self) -> &str;

    async fn ask(&self, system: &str, user: &str) -> Result<String, SelectionError>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic Messages API client.
pub struct AnthropicClient {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(
        http: Client,
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }
}

impl AskAsync for AnthropicClient {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, system: &str, user: &str) -> Result<String, SelectionError> {
        let t0 = Instant::now();
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [ChatMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(SelectionError::Unauthorized(status));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&text, 300), "Model API call failed");
            return Err(SelectionError::Status {
                status,
                body: truncate_for_log(&text, 300),
            });
        }

        let parsed: MessagesResponse = response.json().await?;
        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            chars = text.len(),
            stop_reason = parsed.stop_reason.as_deref().unwrap_or("unknown"),
            "Model call succeeded"
        );
        Ok(text)
    }
}
