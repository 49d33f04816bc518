//! Persistence service — best-effort write-through of chat messages.
//!
//! DESIGN
//! ======
//! The in-memory session list is the source of truth for rendering; the
//! database copy exists for history and audit. Messages go through a
//! bounded queue to a batching worker so the send path never blocks on
//! Postgres I/O.
//!
//! ERROR HANDLING
//! ==============
//! Writes are best-effort: a full queue or a failed batch is logged and
//! dropped. Losing a history row is acceptable; delaying or failing a chat
//! reply is not.

use std::time::Duration;

use sqlx::PgPool;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::payload::Message;
use crate::state::AppState;

const DEFAULT_MESSAGE_PERSIST_QUEUE_CAPACITY: usize = 4096;
const DEFAULT_MESSAGE_PERSIST_BATCH_SIZE: usize = 64;
const DEFAULT_MESSAGE_PERSIST_FLUSH_MS: u64 = 50;
const DEFAULT_MESSAGE_PERSIST_RETRIES: usize = 2;
const DEFAULT_MESSAGE_PERSIST_RETRY_BASE_MS: u64 = 20;

/// Tuning knobs for the message persistence worker, loaded from environment
/// variables.
#[derive(Clone, Copy)]
pub(crate) struct MessagePersistConfig {
    pub(crate) queue_capacity: usize,
    pub(crate) batch_size: usize,
    pub(crate) flush_ms: u64,
    pub(crate) retries: usize,
    pub(crate) retry_base_ms: u64,
}

impl MessagePersistConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            queue_capacity: env_parse("MESSAGE_PERSIST_QUEUE_CAPACITY", DEFAULT_MESSAGE_PERSIST_QUEUE_CAPACITY),
            batch_size: env_parse("MESSAGE_PERSIST_BATCH_SIZE", DEFAULT_MESSAGE_PERSIST_BATCH_SIZE),
            flush_ms: env_parse("MESSAGE_PERSIST_FLUSH_MS", DEFAULT_MESSAGE_PERSIST_FLUSH_MS),
            retries: env_parse("MESSAGE_PERSIST_RETRIES", DEFAULT_MESSAGE_PERSIST_RETRIES),
            retry_base_ms: env_parse("MESSAGE_PERSIST_RETRY_BASE_MS", DEFAULT_MESSAGE_PERSIST_RETRY_BASE_MS),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// One message bound for the database, tagged with its session.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub session_id: Uuid,
    pub message: Message,
}

/// Spawn a bounded message persistence worker and return its queue sender.
#[must_use]
pub fn spawn_message_persistence_worker(pool: PgPool) -> tokio::sync::mpsc::Sender<StoredMessage> {
    let config = MessagePersistConfig::from_env();
    let (tx, mut rx) = tokio::sync::mpsc::channel::<StoredMessage>(config.queue_capacity);

    info!(
        queue_capacity = config.queue_capacity,
        batch_size = config.batch_size,
        flush_ms = config.flush_ms,
        retries = config.retries,
        retry_base_ms = config.retry_base_ms,
        "message persistence worker configured"
    );

    tokio::spawn(async move {
        let mut batch: Vec<StoredMessage> = Vec::with_capacity(config.batch_size);
        let mut ticker = tokio::time::interval(Duration::from_millis(config.flush_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_stored = rx.recv() => {
                    if let Some(stored) = maybe_stored {
                        batch.push(stored);
                        if batch.len() >= config.batch_size {
                            flush_batch_with_retry(&pool, &mut batch, config).await;
                        }
                    } else {
                        flush_batch_with_retry(&pool, &mut batch, config).await;
                        break;
                    }
                }
                _ = ticker.tick() => {
                    flush_batch_with_retry(&pool, &mut batch, config).await;
                }
            }
        }
    });

    tx
}

/// Best-effort, non-blocking enqueue for message persistence.
///
/// Uses `try_send` to avoid adding latency on the chat send path.
pub fn enqueue_message(state: &AppState, session_id: Uuid, message: &Message) {
    let Some(tx) = &state.message_persist_tx else {
        return;
    };

    let stored = StoredMessage { session_id, message: message.clone() };
    match tx.try_send(stored) {
        Ok(()) => {}
        Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
            warn!(id = %message.id, %session_id, "message persist queue full; dropping message");
        }
        Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => {
            warn!(id = %message.id, %session_id, "message persist queue closed; dropping message");
        }
    }
}

async fn flush_batch_with_retry(pool: &PgPool, batch: &mut Vec<StoredMessage>, config: MessagePersistConfig) {
    if batch.is_empty() {
        return;
    }

    let drained = std::mem::take(batch);
    for attempt in 1..=config.retries {
        match persist_message_batch(pool, &drained).await {
            Ok(()) => return,
            Err(e) if attempt < config.retries => {
                warn!(
                    error = %e,
                    attempt,
                    total = config.retries,
                    count = drained.len(),
                    "message batch persist failed; retrying"
                );
                tokio::time::sleep(Duration::from_millis((attempt as u64) * config.retry_base_ms)).await;
            }
            Err(e) => {
                warn!(
                    error = %e,
                    count = drained.len(),
                    "message batch persist failed after retries; dropping messages"
                );
                return;
            }
        }
    }
}

/// Record a new session row.
pub async fn record_session(pool: &PgPool, session_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO chat_sessions (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Persist a batch of messages in one transaction.
///
/// Session rows are upserted first inside the same transaction: the
/// out-of-band `record_session` write on session create can lose the race
/// with the flush ticker, and a missing row must not fail the whole batch
/// on the foreign key.
pub async fn persist_message_batch(pool: &PgPool, batch: &[StoredMessage]) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for session_id in distinct_session_ids(batch) {
        sqlx::query("INSERT INTO chat_sessions (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(session_id)
            .execute(tx.as_mut())
            .await?;
    }
    for stored in batch {
        let message = &stored.message;
        let role = serde_json::to_value(message.role)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let mode = serde_json::to_value(message.mode)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();
        let solutions = serde_json::to_value(&message.solutions).unwrap_or_default();
        let metadata = message_metadata(message);

        sqlx::query(
            "INSERT INTO chat_messages (id, session_id, role, content, mode, show_ai_summary, solutions, metadata, ts)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(message.id)
        .bind(stored.session_id)
        .bind(&role)
        .bind(&message.content)
        .bind(&mode)
        .bind(message.show_ai_summary)
        .bind(&solutions)
        .bind(&metadata)
        .bind(message.ts)
        .execute(tx.as_mut())
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

fn distinct_session_ids(batch: &[StoredMessage]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = batch.iter().map(|stored| stored.session_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Metadata column: everything the UI needs that is not a first-class column,
/// including the raw `ui_payload` so history rows can reconstruct the
/// original upstream record.
fn message_metadata(message: &Message) -> serde_json::Value {
    serde_json::json!({
        "ui_payload": message.ui_payload,
        "ai_summary": message.ai_summary,
        "handover_section": message.handover_section,
        "other_docs": message.other_docs,
        "all_docs": message.all_docs,
        "query_id": message.query_id,
        "conversation_id": message.conversation_id,
        "search_type": message.search_type,
        "original_query": message.original_query,
        "search_strategy": message.search_strategy,
    })
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
