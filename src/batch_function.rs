use async_trait::async_trait;

use crate::error::{LoadError, LoadResult};

/// A `BatchFunction` defines the method through which some `Loader` may fetch
/// batched data from some resource. The `BatchFunction` receives a slice of keys
/// that have been requested during the `Loader`'s most recent execution frame, and some user
/// defined context struct. Keys are distinct and arrive in the order they were first requested.
///
/// Unlike the reference facebook dataloader implementation, the BatchFunction is not required to
/// return a result for all keys that were provided. It may answer in either shape described by
/// [`Batch`]. Requesters of keys whose values are not returned receive `Ok(None)`.
///
/// Returning `Err` fails every key of the batch with the same error. To fail individual keys
/// only, return [`Batch::Aligned`] with per-key `Err` slots.
///
/// Multiple `BatchFunctions` (and therefore loaders) can share the same context (likely through an
/// `Arc`).
#[async_trait]
pub trait BatchFunction<K, V> {
    type Context;
    async fn load(keys: &[K], context: &Self::Context) -> Result<Batch<K, V>, LoadError>;
}

/// The answer of a [`BatchFunction`] for one batch of keys.
#[derive(Debug)]
pub enum Batch<K, V> {
    /// Exactly one slot per requested key, in the order the keys were provided.
    Aligned(Vec<LoadResult<V>>),
    /// Loaded key value pairs, in any order. Missing keys resolve to `None`.
    Keyed(Vec<(K, V)>),
}

impl<K, V> From<Vec<(K, V)>> for Batch<K, V> {
    fn from(pairs: Vec<(K, V)>) -> Self {
        Batch::Keyed(pairs)
    }
}
