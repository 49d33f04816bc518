use super::*;
use crate::payload::{DisplayMode, Role};
use crate::session::APOLOGY;
use crate::state::test_helpers;
use crate::webhook::{ChatWebhook, WebhookError};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

// =========================================================================
// MockWebhook
// =========================================================================

struct MockWebhook {
    responses: Mutex<Vec<Result<Value, WebhookError>>>,
}

impl MockWebhook {
    fn new(responses: Vec<Result<Value, WebhookError>>) -> Self {
        Self { responses: Mutex::new(responses) }
    }
}

#[async_trait::async_trait]
impl ChatWebhook for MockWebhook {
    async fn send_chat(&self, _request: &ChatRequest) -> Result<Value, WebhookError> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(json!({"data": {"response": "ok"}}))
        } else {
            responses.remove(0)
        }
    }

    async fn create_sop(&self, _draft: &Value) -> Result<Value, WebhookError> {
        Ok(json!({"ok": true}))
    }
}

// =========================================================================
// send_message — success path
// =========================================================================

#[tokio::test]
async fn send_appends_user_then_assistant() {
    let mock = Arc::new(MockWebhook::new(vec![Ok(json!({
        "data": {
            "response": "Check the raw water strainer.",
            "ui_payload": {"solutions": [{"title": "Strainer", "confidence": 0.7}]}
        }
    }))]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let reply = send_message(&state, session_id, "engine overheating")
        .await
        .unwrap();
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, "Check the raw water strainer.");
    assert_eq!(reply.solutions.len(), 1);

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
    assert_eq!(session.messages[0].content, "engine overheating");
    assert_eq!(session.messages[1].id, reply.id);
    assert!(!session.is_loading);
}

#[tokio::test]
async fn send_threads_conversation_id_from_previous_reply() {
    struct CaptureWebhook {
        captured: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait::async_trait]
    impl ChatWebhook for CaptureWebhook {
        async fn send_chat(&self, request: &ChatRequest) -> Result<Value, WebhookError> {
            self.captured.lock().unwrap().push(request.clone());
            Ok(json!({"data": {"response": "ok", "conversation_id": "conv-1"}}))
        }

        async fn create_sop(&self, _draft: &Value) -> Result<Value, WebhookError> {
            Ok(json!({"ok": true}))
        }
    }

    let capture = Arc::new(CaptureWebhook { captured: Mutex::new(Vec::new()) });
    let webhook: Arc<dyn ChatWebhook> = capture.clone();
    let state = test_helpers::test_app_state_with_webhook(webhook);
    let session_id = test_helpers::seed_session(&state).await;

    send_message(&state, session_id, "first").await.unwrap();
    send_message(&state, session_id, "second").await.unwrap();

    let captured = capture.captured.lock().unwrap();
    assert_eq!(captured.len(), 2);
    assert!(captured[0].conversation_id.is_none());
    assert_eq!(captured[1].conversation_id.as_deref(), Some("conv-1"));
    assert_eq!(captured[1].session_id, session_id);
}

// =========================================================================
// send_message — failure degrades to the apology reply
// =========================================================================

#[tokio::test]
async fn network_error_yields_exactly_one_apology() {
    let mock = Arc::new(MockWebhook::new(vec![Err(WebhookError::Request(
        "connection refused".into(),
    ))]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let reply = send_message(&state, session_id, "hello").await.unwrap();
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.content, APOLOGY);
    assert!(reply.solutions.is_empty());
    assert_eq!(reply.mode, DisplayMode::Search);

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    assert_eq!(session.messages.len(), 2);
    assert!(!session.is_loading);
    assert_eq!(session.last_error.as_deref(), Some("webhook request failed: connection refused"));
}

#[tokio::test]
async fn non_2xx_status_also_degrades() {
    let mock = Arc::new(MockWebhook::new(vec![Err(WebhookError::Response {
        status: 502,
        body: "bad gateway".into(),
    })]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let reply = send_message(&state, session_id, "hello").await.unwrap();
    assert_eq!(reply.content, APOLOGY);
}

#[tokio::test]
async fn unconfigured_webhook_degrades() {
    let state = test_helpers::test_app_state();
    let session_id = test_helpers::seed_session(&state).await;

    let reply = send_message(&state, session_id, "hello").await.unwrap();
    assert_eq!(reply.content, APOLOGY);

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    // User message is still appended optimistically.
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[0].role, Role::User);
}

#[tokio::test]
async fn malformed_payload_never_fails_the_send() {
    let mock = Arc::new(MockWebhook::new(vec![Ok(json!({
        "data": {"ui_payload": {"primary_findings": "not an array"}}
    }))]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let reply = send_message(&state, session_id, "hello").await.unwrap();
    assert!(reply.solutions.is_empty());
    assert_eq!(reply.mode, DisplayMode::Search);
}

// =========================================================================
// send_message — unknown session
// =========================================================================

#[tokio::test]
async fn unknown_session_is_an_error() {
    let state = test_helpers::test_app_state();
    let result = send_message(&state, uuid::Uuid::new_v4(), "hello").await;
    assert!(matches!(result.unwrap_err(), ChatError::SessionNotFound(_)));
}
