use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// The outcome of loading a single key: a value, an explicit absence, or a failure.
pub type LoadResult<V> = Result<Option<V>, LoadError>;

/// Errors surfaced to the callers of a [`crate::Loader`].
///
/// Every waiter of a failed batch receives a clone of the same error, so the variants only hold
/// cheaply clonable data.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The bulk fetch for a whole batch failed.
    #[error("batch fetch failed: {0}")]
    Fetch(Arc<dyn StdError + Send + Sync>),

    /// The bulk fetch succeeded but marked this particular key as failed.
    #[error("key failed to load: {message}")]
    Key { message: String },

    /// A positional batch did not return one slot per requested key.
    #[error("batch returned {actual} results for {expected} keys")]
    Misaligned { expected: usize, actual: usize },

    /// The loader's worker is no longer running.
    #[error("loader worker stopped")]
    WorkerStopped,
}

impl LoadError {
    pub fn fetch<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        LoadError::Fetch(Arc::new(err))
    }

    pub fn key(message: impl Into<String>) -> Self {
        LoadError::Key { message: message.into() }
    }
}
