//! Cache store error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The writer actor is gone; the store handle is unusable.
    #[error("Cache store is closed")]
    Closed,
}
