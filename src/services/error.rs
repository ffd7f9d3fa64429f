use thiserror::Error;

use crate::storage::StorageError;

use super::dispatch::DispatchError;

/// Errors surfaced by services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    /// The content already belongs to another document.
    #[error("content already stored as document {existing_id}")]
    Duplicate {
        existing_id: String,
        existing_title: String,
    },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ServiceError {
    pub fn forbidden(action: &str) -> Self {
        ServiceError::Forbidden(format!("not allowed to {}", action))
    }

    pub fn document_not_found(id: &str) -> Self {
        ServiceError::NotFound(format!("document {}", id))
    }
}
