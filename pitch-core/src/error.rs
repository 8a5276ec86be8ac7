use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PitchError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
