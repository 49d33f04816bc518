use super::*;
use crate::state::test_helpers;
use crate::webhook::{ChatRequest, ChatWebhook, WebhookError};
use serde_json::json;
use std::sync::{Arc, Mutex};

struct MockSopWebhook {
    responses: Mutex<Vec<Result<Value, WebhookError>>>,
    drafts: Mutex<Vec<Value>>,
}

impl MockSopWebhook {
    fn new(responses: Vec<Result<Value, WebhookError>>) -> Self {
        Self { responses: Mutex::new(responses), drafts: Mutex::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl ChatWebhook for MockSopWebhook {
    async fn send_chat(&self, _request: &ChatRequest) -> Result<Value, WebhookError> {
        Ok(json!({"data": {"response": "ok"}}))
    }

    async fn create_sop(&self, draft: &Value) -> Result<Value, WebhookError> {
        self.drafts.lock().unwrap().push(draft.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(json!({"sop_id": "sop-1"}))
        } else {
            responses.remove(0)
        }
    }
}

// =========================================================================
// create_sop
// =========================================================================

#[tokio::test]
async fn create_success_returns_body_and_clears_state() {
    let mock = Arc::new(MockSopWebhook::new(vec![]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let body = create_sop(&state, session_id, json!({"title": "Bilge pump check"}))
        .await
        .unwrap();
    assert_eq!(body.get("sop_id"), Some(&json!("sop-1")));

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    assert!(session.sop_error.is_none());
    assert!(session.pending_sop.is_none());
}

#[tokio::test]
async fn create_failure_parks_draft_and_error_state() {
    let mock = Arc::new(MockSopWebhook::new(vec![Err(WebhookError::Response {
        status: 503,
        body: "unavailable".into(),
    })]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let draft = json!({"title": "Bilge pump check"});
    let err = create_sop(&state, session_id, draft.clone()).await.unwrap_err();
    assert!(matches!(&err, SopError::Upstream { retryable: true, code, .. } if code == "E_RESPONSE"));

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    let error_state = session.sop_error.as_ref().unwrap();
    assert!(error_state.retryable);
    assert_eq!(error_state.code, "E_RESPONSE");
    assert_eq!(session.pending_sop, Some(draft));
}

#[tokio::test]
async fn create_non_retryable_failure_is_reported_as_such() {
    let mock = Arc::new(MockSopWebhook::new(vec![Err(WebhookError::Response {
        status: 400,
        body: "bad draft".into(),
    })]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let err = create_sop(&state, session_id, json!({})).await.unwrap_err();
    assert!(matches!(err, SopError::Upstream { retryable: false, .. }));
}

#[tokio::test]
async fn create_without_webhook_is_not_configured() {
    let state = test_helpers::test_app_state();
    let session_id = test_helpers::seed_session(&state).await;
    let err = create_sop(&state, session_id, json!({})).await.unwrap_err();
    assert!(matches!(err, SopError::NotConfigured));
}

#[tokio::test]
async fn create_unknown_session_is_an_error() {
    let mock = Arc::new(MockSopWebhook::new(vec![]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let err = create_sop(&state, Uuid::new_v4(), json!({})).await.unwrap_err();
    assert!(matches!(err, SopError::SessionNotFound(_)));
}

// =========================================================================
// retry_sop
// =========================================================================

#[tokio::test]
async fn retry_reposts_same_draft_and_clears_state_on_success() {
    let mock = Arc::new(MockSopWebhook::new(vec![Err(WebhookError::Request(
        "connect timeout".into(),
    ))]));
    let webhook: Arc<dyn ChatWebhook> = mock.clone();
    let state = test_helpers::test_app_state_with_webhook(webhook);
    let session_id = test_helpers::seed_session(&state).await;

    let draft = json!({"title": "Fuel filter swap", "steps": ["close valve", "swap filter"]});
    let _ = create_sop(&state, session_id, draft.clone()).await.unwrap_err();
    assert!(sop_error(&state, session_id).await.unwrap().is_some());

    // Second attempt (mock queue empty) succeeds.
    let body = retry_sop(&state, session_id).await.unwrap();
    assert_eq!(body.get("sop_id"), Some(&json!("sop-1")));
    assert!(sop_error(&state, session_id).await.unwrap().is_none());

    let drafts = mock.drafts.lock().unwrap();
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0], drafts[1]);
}

#[tokio::test]
async fn retry_without_pending_draft_is_an_error() {
    let mock = Arc::new(MockSopWebhook::new(vec![]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let err = retry_sop(&state, session_id).await.unwrap_err();
    assert!(matches!(err, SopError::NoPendingDraft));
}

#[tokio::test]
async fn repeated_failures_keep_the_draft_parked() {
    let mock = Arc::new(MockSopWebhook::new(vec![
        Err(WebhookError::Request("first".into())),
        Err(WebhookError::Request("second".into())),
    ]));
    let state = test_helpers::test_app_state_with_webhook(mock);
    let session_id = test_helpers::seed_session(&state).await;

    let draft = json!({"title": "draft"});
    let _ = create_sop(&state, session_id, draft.clone()).await.unwrap_err();
    let _ = retry_sop(&state, session_id).await.unwrap_err();

    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).unwrap();
    assert_eq!(session.pending_sop, Some(draft));
    assert!(session.sop_error.is_some());
}
