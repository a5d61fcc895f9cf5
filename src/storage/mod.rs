//! Persistence: an embedded SQLite database exposed as a string key-value
//! store with TTLs, plus the gallery item table.

pub mod kv;
pub mod migrations;
pub mod retention;
pub mod sqlite;

pub use kv::{IndexEntry, KvStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool setup error: {0}")]
    CreatePool(#[from] deadpool_sqlite::CreatePoolError),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_sqlite::PoolError),

    #[error("interact error: {0}")]
    Interact(#[from] deadpool_sqlite::InteractError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
