//! Chat service — user message → webhook call → normalized assistant reply.
//!
//! DESIGN
//! ======
//! The user message is appended optimistically before the webhook call, so
//! a failed send never corrupts the list: the failure path only appends one
//! synthetic apology reply on top. No automatic retry, no cancellation of
//! in-flight calls. Overlapping sends from the same session are handled
//! independently and append in arrival order.

use tracing::{info, warn};
use uuid::Uuid;

use crate::normalize::normalize_response;
use crate::payload::Message;
use crate::services::persistence;
use crate::session::ChatAction;
use crate::state::AppState;
use crate::webhook::ChatRequest;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
}

// =============================================================================
// SEND
// =============================================================================

/// Handle one user send end to end.
///
/// Always resolves to an assistant [`Message`]: webhook failures (and an
/// unconfigured webhook) degrade to the fixed apology reply instead of an
/// error. The only error is an unknown session.
///
/// # Errors
///
/// Returns [`ChatError::SessionNotFound`] if the session does not exist.
pub async fn send_message(state: &AppState, session_id: Uuid, content: &str) -> Result<Message, ChatError> {
    info!(%session_id, content_len = content.len(), "chat: message received");

    // Optimistic append: the user bubble renders before the reply exists.
    let (user_message, conversation_id) = {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;
        let conversation_id = session.last_conversation_id().map(String::from);
        let appended = session.apply(ChatAction::SendMessage { content: content.into() });
        (appended, conversation_id)
    };
    if let Some(user_message) = &user_message {
        persistence::enqueue_message(state, session_id, user_message);
    }

    let outcome = match &state.webhook {
        Some(webhook) => {
            let request = ChatRequest { session_id, conversation_id, message: content.into() };
            webhook
                .send_chat(&request)
                .await
                .map(|body| normalize_response(&body))
                .map_err(|e| {
                    warn!(%session_id, error = %e, code = e.error_code(), "chat: webhook call failed");
                    e.to_string()
                })
        }
        None => {
            warn!(%session_id, "chat: webhook not configured");
            Err("webhook not configured".to_string())
        }
    };

    let action = match outcome {
        Ok(reply) => {
            info!(
                %session_id,
                solutions = reply.solutions.len(),
                mode = ?reply.mode,
                "chat: reply normalized"
            );
            ChatAction::ReceiveMessage { message: Box::new(reply) }
        }
        Err(detail) => ChatAction::SetError { detail },
    };

    let appended = {
        let mut sessions = state.sessions.write().await;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(ChatError::SessionNotFound(session_id))?;
        session.apply(action)
    };

    // ReceiveMessage and SetError always append.
    let Some(reply) = appended else {
        return Err(ChatError::SessionNotFound(session_id));
    };
    persistence::enqueue_message(state, session_id, &reply);
    Ok(reply)
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
