//! Database initialization and migration runner.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool and enforce
//! schema migrations before accepting API traffic. Chat history lives in
//! memory at runtime; the persistence worker flushes a write-through copy
//! into the tables these migrations create.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::services::persistence::env_parse;

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// Pool size is tunable via `DB_MAX_CONNECTIONS` (default 5).
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS))
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_connections_defaults_when_env_unset() {
        // No other test touches DB_MAX_CONNECTIONS, so reading it is safe.
        assert_eq!(
            env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            DEFAULT_DB_MAX_CONNECTIONS
        );
    }
}
