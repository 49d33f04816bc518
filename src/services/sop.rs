//! SOP service — draft creation with a two-tier fallback.
//!
//! DESIGN
//! ======
//! Tier one is the normal create call. When it fails, the draft and a
//! typed error state are parked on the session and surfaced to the UI,
//! which offers a manual retry; tier two re-posts the same draft to the
//! same endpoint on that explicit user action. There is no automatic
//! retry in between.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::session::SopErrorState;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SopError {
    #[error("session not found: {0}")]
    SessionNotFound(Uuid),
    #[error("SOP webhook not configured")]
    NotConfigured,
    #[error("no pending SOP draft to retry")]
    NoPendingDraft,
    #[error("SOP creation failed: {message}")]
    Upstream { message: String, code: String, retryable: bool },
}

// =============================================================================
// CREATE / RETRY
// =============================================================================

/// Submit an SOP draft. On upstream failure the draft is kept on the
/// session for an explicit retry and the error state is recorded.
///
/// # Errors
///
/// Returns [`SopError::SessionNotFound`], [`SopError::NotConfigured`], or
/// [`SopError::Upstream`] with the recorded error state.
pub async fn create_sop(state: &AppState, session_id: Uuid, draft: Value) -> Result<Value, SopError> {
    ensure_session(state, session_id).await?;
    let Some(webhook) = &state.webhook else {
        return Err(SopError::NotConfigured);
    };

    info!(%session_id, "sop: submitting draft");
    match webhook.create_sop(&draft).await {
        Ok(body) => {
            let mut sessions = state.sessions.write().await;
            if let Some(session) = sessions.get_mut(&session_id) {
                session.sop_error = None;
                session.pending_sop = None;
            }
            info!(%session_id, "sop: draft accepted");
            Ok(body)
        }
        Err(e) => {
            warn!(%session_id, error = %e, code = e.error_code(), "sop: draft rejected");
            let error_state = SopErrorState {
                message: e.to_string(),
                code: e.error_code().to_string(),
                retryable: e.retryable(),
            };
            let mut sessions = state.sessions.write().await;
            if let Some(session) = sessions.get_mut(&session_id) {
                session.sop_error = Some(error_state.clone());
                session.pending_sop = Some(draft);
            }
            Err(SopError::Upstream {
                message: error_state.message,
                code: error_state.code,
                retryable: error_state.retryable,
            })
        }
    }
}

/// Re-post the parked draft. Explicit user action only.
///
/// # Errors
///
/// Returns [`SopError::NoPendingDraft`] when nothing is parked, otherwise
/// the same failure modes as [`create_sop`].
pub async fn retry_sop(state: &AppState, session_id: Uuid) -> Result<Value, SopError> {
    let draft = {
        let sessions = state.sessions.read().await;
        let session = sessions
            .get(&session_id)
            .ok_or(SopError::SessionNotFound(session_id))?;
        session.pending_sop.clone().ok_or(SopError::NoPendingDraft)?
    };

    info!(%session_id, "sop: retrying parked draft");
    create_sop(state, session_id, draft).await
}

/// Current SOP error state for the session, if any.
///
/// # Errors
///
/// Returns [`SopError::SessionNotFound`] if the session does not exist.
pub async fn sop_error(state: &AppState, session_id: Uuid) -> Result<Option<SopErrorState>, SopError> {
    let sessions = state.sessions.read().await;
    let session = sessions
        .get(&session_id)
        .ok_or(SopError::SessionNotFound(session_id))?;
    Ok(session.sop_error.clone())
}

async fn ensure_session(state: &AppState, session_id: Uuid) -> Result<(), SopError> {
    let sessions = state.sessions.read().await;
    if sessions.contains_key(&session_id) {
        Ok(())
    } else {
        Err(SopError::SessionNotFound(session_id))
    }
}

#[cfg(test)]
#[path = "sop_test.rs"]
mod tests;
