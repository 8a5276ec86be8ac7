//! Idea history store.
//!
//! Generated artifacts are written once as JSON documents and never updated.
//! The PostgreSQL backend keeps each collection in its own table:
//!
//! ```sql
//! CREATE TABLE "Idea_History" (
//!     id         UUID PRIMARY KEY,
//!     document   JSONB NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::OnceCell;
use thiserror::Error;
use uuid::Uuid;

use crate::models::GeneratedArtifact;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),
}

/// Append-only document store for generated artifacts.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert one record and return the store-assigned identifier.
    async fn insert_one(&self, record: &GeneratedArtifact) -> Result<String, StoreError>;

    /// Cheap connectivity probe; returns a backend description.
    async fn health(&self) -> Result<String, StoreError>;

    /// Collection the records land in.
    fn collection(&self) -> &str;
}

/// Collection names are interpolated into SQL, so only ASCII letters, digits
/// and underscores are accepted, and the name must not start with a digit.
pub fn validate_collection(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidCollection(name.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
    collection: String,
    /// Set once the table is known to exist. A failed attempt leaves it
    /// unset so the next write tries again.
    prepared: Arc<OnceCell<()>>,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool, collection: impl Into<String>) -> Result<Self, StoreError> {
        let collection = collection.into();
        validate_collection(&collection)?;
        Ok(Self {
            pool,
            collection,
            prepared: Arc::new(OnceCell::new()),
        })
    }

    /// Create the collection table if it does not exist yet. Runs the DDL at
    /// most once per store after it has succeeded.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        self.prepared
            .get_or_try_init(|| self.create_collection())
            .await?;
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared.initialized()
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS "{}" (
                id UUID PRIMARY KEY,
                document JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )"#,
            self.collection
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        tracing::info!(collection = %self.collection, "Collection ready");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn insert_one(&self, record: &GeneratedArtifact) -> Result<String, StoreError> {
        self.ensure_collection().await?;

        let id = Uuid::new_v4();
        let document = serde_json::to_value(record)?;
        let sql = format!(
            r#"INSERT INTO "{}" (id, document, created_at) VALUES ($1, $2, $3)"#,
            self.collection
        );

        sqlx::query(&sql)
            .bind(id)
            .bind(&document)
            .bind(record.timestamp)
            .execute(&self.pool)
            .await?;

        tracing::info!(record_id = %id, collection = %self.collection, "Stored generated artifact");
        Ok(id.to_string())
    }

    async fn health(&self) -> Result<String, StoreError> {
        Ok(crate::db::health_check(&self.pool).await?)
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
