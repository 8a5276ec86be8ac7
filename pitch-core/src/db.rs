use crate::config::DatabaseConfig;
use crate::error::PitchError;
use crate::store::PgHistoryStore;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

/// Build a lazily connecting pool. No connection is attempted until the first
/// query, so an unreachable or unset database surfaces on first use. An empty
/// URL falls back to the `PG*` environment defaults. The configured database
/// name always wins over the one in the URL or environment.
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool, PitchError> {
    let mut options = if config.url.is_empty() {
        tracing::warn!("No database URL configured, using PG* environment defaults");
        PgConnectOptions::new()
    } else {
        config.url.parse::<PgConnectOptions>()?
    };

    if !config.database.is_empty() {
        if let Some(named) = options.get_database().filter(|db| *db != config.database) {
            tracing::warn!(
                url_database = %named,
                database = %config.database,
                "Database URL names a different database; using the configured one"
            );
        }
        options = options.database(&config.database);
    }

    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_lazy_with(options))
}

/// Pool plus collection handle for the configured database.
pub fn open_history_store(config: &DatabaseConfig) -> Result<PgHistoryStore, PitchError> {
    let pool = create_pool(config)?;
    tracing::info!(
        database = %config.database,
        collection = %config.collection,
        "History store configured"
    );
    Ok(PgHistoryStore::new(pool, config.collection.clone())?)
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
