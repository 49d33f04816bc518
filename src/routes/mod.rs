//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the REST endpoints the chat client talks to. All
//! session state lives behind `AppState`; handlers are thin wrappers over
//! the service layer.

pub mod sessions;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/{id}/messages",
            get(sessions::list_messages).post(sessions::send_message),
        )
        .route("/api/sessions/{id}/sop", post(sessions::create_sop))
        .route("/api/sessions/{id}/sop/retry", post(sessions::retry_sop))
        .route("/api/sessions/{id}/sop/error", get(sessions::sop_error))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
