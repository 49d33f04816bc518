//! Webhook configuration parsed from environment variables.

use super::types::WebhookError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WebhookTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub chat_url: String,
    pub sop_url: String,
    pub timeouts: WebhookTimeouts,
}

impl WebhookConfig {
    /// Build typed webhook config from environment variables.
    ///
    /// Required:
    /// - `CHAT_WEBHOOK_URL`
    ///
    /// Optional:
    /// - `SOP_WEBHOOK_URL`: defaults to the chat URL
    /// - `WEBHOOK_REQUEST_TIMEOUT_SECS`: default 120
    /// - `WEBHOOK_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::MissingUrl`] if `CHAT_WEBHOOK_URL` is unset.
    pub fn from_env() -> Result<Self, WebhookError> {
        let chat_url = std::env::var("CHAT_WEBHOOK_URL")
            .map_err(|_| WebhookError::MissingUrl { var: "CHAT_WEBHOOK_URL".into() })?
            .trim_end_matches('/')
            .to_string();
        let sop_url = std::env::var("SOP_WEBHOOK_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| chat_url.clone());

        let timeouts = WebhookTimeouts {
            request_secs: env_parse_u64("WEBHOOK_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("WEBHOOK_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { chat_url, sop_url, timeouts })
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
