use crate::configuration::{ConnectionPrep, PostgresSettings};
use crate::modules::store::{GroupStore, MemoryStore, PgStore};
use sqlx::migrate;
use sqlx::postgres::PgPoolOptions;
pub use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn get_postgres_pool(config: PostgresSettings) -> PgPool {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs()))
        .connect(&config.get_connection_string())
        .await
        .expect("Cannot establish postgres connection");
    if config.is_migrating() {
        migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Auto migration failed");
    }
    pool
}

/// Picks the one persistence strategy for this process.
pub async fn get_store(config: Option<PostgresSettings>) -> Arc<dyn GroupStore> {
    match config {
        Some(postgres) => Arc::new(PgStore::new(get_postgres_pool(postgres).await)),
        None => {
            info!("No postgres configured, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    }
}
