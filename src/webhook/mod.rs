//! Webhook — the boundary to the external chat/SOP backend.
//!
//! DESIGN
//! ======
//! The app treats the webhook as an uncontrolled, variably-shaped boundary:
//! the trait returns raw JSON and the normalizer deals with shape. The HTTP
//! implementation is configured from environment variables; tests swap in
//! mock implementations of [`ChatWebhook`].

pub mod config;
pub mod http;
pub mod types;

pub use http::HttpWebhook;
pub use types::{ChatRequest, ChatWebhook, WebhookError};
