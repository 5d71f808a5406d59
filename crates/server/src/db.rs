//! PostgreSQL pool bring-up for the optional vector/analytics features.

use sqlx::PgPool;
use tracing::{info, warn};

/// Connects and runs migrations. Returns `None` if `POSTGRES_URL` is not
/// configured, or if connecting/migrating fails — a plugin instance with
/// no reachable Postgres still serves the job queue, just without
/// `/recommendations` or analytics ingestion.
pub async fn init_pg_pool(config: &auris_core::PostgresConfig) -> Option<PgPool> {
    if !config.is_configured() {
        info!("POSTGRES_URL not set — vector/analytics features disabled");
        return None;
    }
    let url = config.connection_string();
    let masked = if let Some(at_pos) = url.find('@') {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        format!("{}***@{}", &url[..scheme_end], &url[at_pos + 1..])
    } else {
        url.clone()
    };
    info!("connecting to PostgreSQL: {}", masked);

    let pool = match sqlx::postgres::PgPoolOptions::new().max_connections(config.max_connections).connect(&url).await {
        Ok(pool) => pool,
        Err(e) => {
            warn!("failed to connect to PostgreSQL: {e} — vector/analytics features disabled");
            return None;
        }
    };

    match sqlx::migrate!("../../migrations").run(&pool).await {
        Ok(_) => {
            info!("database migrations applied");
            Some(pool)
        }
        Err(e) => {
            warn!("failed to run migrations: {e} — vector/analytics features disabled");
            None
        }
    }
}
