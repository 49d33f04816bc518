//! Chat session routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::payload::Message;
use crate::services::{chat, persistence, sop};
use crate::session::{ChatSession, SopErrorState};
use crate::state::AppState;

#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
}

#[derive(Deserialize)]
pub struct SendMessageBody {
    pub message: String,
}

/// `POST /api/sessions` — start a new chat session.
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let session_id = Uuid::new_v4();
    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id, ChatSession::new(session_id));
    }

    // Best-effort session row; history writes still land via ON CONFLICT-safe
    // inserts even if this one loses.
    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(e) = persistence::record_session(&pool, session_id).await {
            warn!(%session_id, error = %e, "failed to record session row");
        }
    });

    (StatusCode::CREATED, Json(SessionResponse { session_id }))
}

/// `GET /api/sessions/:id/messages` — ordered message list.
pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&session_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(session.messages.clone()))
}

/// `POST /api/sessions/:id/messages` — send a message, returns the
/// assistant reply (or the apology reply when the webhook is down).
pub async fn send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<Message>, StatusCode> {
    let reply = chat::send_message(&state, session_id, &body.message)
        .await
        .map_err(chat_error_to_status)?;
    Ok(Json(reply))
}

/// `POST /api/sessions/:id/sop` — submit an SOP draft.
pub async fn create_sop(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(draft): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let body = sop::create_sop(&state, session_id, draft)
        .await
        .map_err(sop_error_to_status)?;
    Ok(Json(body))
}

/// `POST /api/sessions/:id/sop/retry` — re-post the parked SOP draft.
pub async fn retry_sop(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    let body = sop::retry_sop(&state, session_id)
        .await
        .map_err(sop_error_to_status)?;
    Ok(Json(body))
}

/// `GET /api/sessions/:id/sop/error` — current SOP error state, if any.
pub async fn sop_error(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Option<SopErrorState>>, StatusCode> {
    let error_state = sop::sop_error(&state, session_id)
        .await
        .map_err(sop_error_to_status)?;
    Ok(Json(error_state))
}

pub(crate) fn chat_error_to_status(err: chat::ChatError) -> StatusCode {
    match err {
        chat::ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
    }
}

pub(crate) fn sop_error_to_status(err: sop::SopError) -> StatusCode {
    match err {
        sop::SopError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        sop::SopError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        sop::SopError::NoPendingDraft => StatusCode::CONFLICT,
        sop::SopError::Upstream { .. } => StatusCode::BAD_GATEWAY,
    }
}

#[cfg(test)]
#[path = "sessions_test.rs"]
mod tests;
