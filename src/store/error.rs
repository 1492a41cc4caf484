//! Store error types.

use thiserror::Error;

use crate::error::LoadError;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The backing store could not serve the operation.
    #[error("store unavailable during {operation}")]
    Unavailable { operation: &'static str },
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound { entity, id: id.to_string() }
    }
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        LoadError::fetch(err)
    }
}
