//! LLM Provider trait and the provider error taxonomy.
//!
//! Every backend implements [`LlmProvider`]. Failures come back as an
//! [`LlmError`] whose variant tells the agent loop how to react; callers
//! never have to inspect error strings.

use std::time::Duration;

use async_trait::async_trait;
use webpilot_core::types::{LlmResponse, Message, ToolDefinition};

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// A failed decision call, classified.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LlmError {
    /// Bad or revoked credentials, or a key without access to the model.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The account has run out of credit or quota.
    #[error("quota exhausted: {0}")]
    QuotaExceeded(String),

    /// Too many requests; the same call may be re-issued later.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The provider rejected the request body (e.g. malformed history).
    #[error("request rejected: {0}")]
    InvalidRequest(String),

    /// Network failure, server error, or an unreadable response.
    #[error("LLM service error: {0}")]
    Transport(String),
}

impl LlmError {
    /// Classify an HTTP error response.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        let detail = format!("HTTP {status}: {body}");
        match status {
            401 | 403 => LlmError::Authentication(detail),
            402 => LlmError::QuotaExceeded(detail),
            429 if is_quota_body(body) => LlmError::QuotaExceeded(detail),
            429 => LlmError::RateLimited {
                message: detail,
                retry_after,
            },
            400 => LlmError::InvalidRequest(detail),
            _ => LlmError::Transport(detail),
        }
    }

    /// Whether the task cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LlmError::Authentication(_) | LlmError::QuotaExceeded(_)
        )
    }
}

/// OpenAI reports exhausted credit as a 429 with `insufficient_quota`.
fn is_quota_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("insufficient_quota") || lower.contains("billing")
}

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages`: Conversation history in OpenAI format.
    /// * `tools`   : Optional tool catalog the LLM can call.
    /// * `model`   : Model identifier (e.g. `"gpt-4o"`).
    /// * `config`  : Temperature, max_tokens, etc.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError>;

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
