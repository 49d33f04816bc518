//! Webhook types — the boundary trait and its errors.
//!
//! The wire shape of responses is owned by the external webhook, not by
//! this crate, so both calls return raw `serde_json::Value` and leave
//! interpretation to the normalizer.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by webhook calls.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The chat webhook URL is not configured.
    #[error("missing webhook URL: env var {var} not set")]
    MissingUrl { var: String },

    /// The HTTP request could not be sent or timed out.
    #[error("webhook request failed: {0}")]
    Request(String),

    /// The webhook returned a non-success HTTP status.
    #[error("webhook response error: status {status}")]
    Response { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("webhook response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl WebhookError {
    /// Grepable error code for logs and SOP error state.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingUrl { .. } => "E_MISSING_URL",
            Self::Request(_) => "E_REQUEST",
            Self::Response { .. } => "E_RESPONSE",
            Self::Parse(_) => "E_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    /// Whether a manual retry of the same call could plausibly succeed.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Outgoing chat request. The webhook threads follow-ups with the
/// conversation id of the previous reply.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub message: String,
}

// =============================================================================
// WEBHOOK TRAIT
// =============================================================================

/// Async boundary to the external chat backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ChatWebhook: Send + Sync {
    /// Send a chat message and return the raw response body.
    ///
    /// # Errors
    ///
    /// Returns a [`WebhookError`] on network failure, non-2xx status, or a
    /// non-JSON body.
    async fn send_chat(&self, request: &ChatRequest) -> Result<Value, WebhookError>;

    /// Submit an SOP draft for creation and return the raw response body.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`ChatWebhook::send_chat`].
    async fn create_sop(&self, draft: &Value) -> Result<Value, WebhookError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
