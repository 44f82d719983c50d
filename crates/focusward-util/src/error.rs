//! Error types for focusward

use thiserror::Error;

/// Core error type for focusward operations
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl FocusError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FocusError>;
