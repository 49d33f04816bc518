//! HTTP webhook client.
//!
//! Thin reqwest wrapper: POST JSON, surface non-2xx as typed errors, parse
//! the body as JSON. No automatic retry — failed sends degrade to a chat
//! message and SOP failures wait for an explicit user retry.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use super::config::{WebhookConfig, WebhookTimeouts};
use super::types::{ChatRequest, ChatWebhook, WebhookError};

pub struct HttpWebhook {
    http: reqwest::Client,
    chat_url: String,
    sop_url: String,
}

impl HttpWebhook {
    /// Build the client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `CHAT_WEBHOOK_URL` is unset or the HTTP client
    /// fails to build.
    pub fn from_env() -> Result<Self, WebhookError> {
        Self::from_config(WebhookConfig::from_env()?)
    }

    /// Build the client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: WebhookConfig) -> Result<Self, WebhookError> {
        let http = build_http_client(config.timeouts)?;
        Ok(Self { http, chat_url: config.chat_url, sop_url: config.sop_url })
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value, WebhookError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| WebhookError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| WebhookError::Request(e.to_string()))?;

        interpret_response(status, text)
    }
}

/// Map a received status and body to a parsed JSON result.
fn interpret_response(status: u16, body: String) -> Result<Value, WebhookError> {
    if !(200..300).contains(&status) {
        return Err(WebhookError::Response { status, body });
    }

    serde_json::from_str(&body).map_err(|e| WebhookError::Parse(e.to_string()))
}

fn build_http_client(timeouts: WebhookTimeouts) -> Result<reqwest::Client, WebhookError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
        .map_err(|e| WebhookError::HttpClientBuild(e.to_string()))
}

#[async_trait::async_trait]
impl ChatWebhook for HttpWebhook {
    async fn send_chat(&self, request: &ChatRequest) -> Result<Value, WebhookError> {
        self.post_json(&self.chat_url, request).await
    }

    async fn create_sop(&self, draft: &Value) -> Result<Value, WebhookError> {
        self.post_json(&self.sop_url, draft).await
    }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
