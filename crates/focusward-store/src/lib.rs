//! Policy store for focuswardd
//!
//! Provides:
//! - The shared key/value policy state (`blockedFlags`, unlock and sleep settings)
//! - Change notifications, emitted only when a stored value actually changes
//! - Typed accessors that treat malformed values as absent
//! - SQLite-backed and in-memory implementations

mod memory;
mod sqlite;
mod traits;
mod typed;

pub use memory::*;
pub use sqlite::*;
pub use traits::*;
pub use typed::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
