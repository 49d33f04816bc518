use super::*;

#[test]
fn error_codes_are_stable() {
    assert_eq!(WebhookError::MissingUrl { var: "CHAT_WEBHOOK_URL".into() }.error_code(), "E_MISSING_URL");
    assert_eq!(WebhookError::Request("timeout".into()).error_code(), "E_REQUEST");
    assert_eq!(WebhookError::Response { status: 502, body: String::new() }.error_code(), "E_RESPONSE");
    assert_eq!(WebhookError::Parse("eof".into()).error_code(), "E_PARSE");
}

#[test]
fn transport_and_server_errors_are_retryable() {
    assert!(WebhookError::Request("connection reset".into()).retryable());
    assert!(WebhookError::Response { status: 429, body: String::new() }.retryable());
    assert!(WebhookError::Response { status: 503, body: String::new() }.retryable());
}

#[test]
fn client_errors_are_not_retryable() {
    assert!(!WebhookError::Response { status: 400, body: String::new() }.retryable());
    assert!(!WebhookError::Response { status: 404, body: String::new() }.retryable());
    assert!(!WebhookError::Parse("bad json".into()).retryable());
    assert!(!WebhookError::MissingUrl { var: "CHAT_WEBHOOK_URL".into() }.retryable());
}

#[test]
fn chat_request_omits_absent_conversation_id() {
    let request = ChatRequest {
        session_id: Uuid::nil(),
        conversation_id: None,
        message: "hello".into(),
    };
    let encoded = serde_json::to_value(&request).unwrap();
    assert!(encoded.get("conversation_id").is_none());
    assert_eq!(encoded.get("message").and_then(Value::as_str), Some("hello"));
}

#[test]
fn chat_request_serializes_conversation_id_when_present() {
    let request = ChatRequest {
        session_id: Uuid::nil(),
        conversation_id: Some("conv-9".into()),
        message: "follow-up".into(),
    };
    let encoded = serde_json::to_value(&request).unwrap();
    assert_eq!(encoded.get("conversation_id").and_then(Value::as_str), Some("conv-9"));
}
