mod db;
mod normalize;
mod payload;
mod routes;
mod services;
mod session;
mod state;
mod webhook;

use std::sync::Arc;

use webhook::{ChatWebhook, HttpWebhook};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Initialize the webhook client (non-fatal: chat degrades to the apology
    // reply if config is missing).
    let webhook: Option<Arc<dyn ChatWebhook>> = match HttpWebhook::from_env() {
        Ok(client) => {
            tracing::info!("webhook client initialized");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "webhook not configured — chat replies degrade to the apology path");
            None
        }
    };

    // Spawn the background message persistence worker.
    let persist_tx = services::persistence::spawn_message_persistence_worker(pool.clone());
    let state = state::AppState::new(pool, webhook).with_message_persist_tx(persist_tx);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "celesteos-chat listening");
    axum::serve(listener, app).await.expect("server failed");
}
