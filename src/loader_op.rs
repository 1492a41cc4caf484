use std::slice;

use tokio::sync::oneshot;

use crate::error::LoadResult;
use crate::worker_stats::BatchStats;

/// Messages understood by the [`crate::loader_worker::LoaderWorker`].
///
/// Loads carry the channel their answer goes back on. Primes and clears mutate the cache in place.
/// Stats reads the worker's counters.
#[derive(Debug)]
pub enum LoaderOp<K, V> {
    /// Resolve keys from the cache, or stage them for the next flush.
    Load(LoadRequest<K, V>),
    /// Seed the cache with values obtained outside the batch function.
    Prime(K, V),
    PrimeMany(Vec<(K, V)>),
    /// Forget cached outcomes; the next load of those keys fetches again.
    Clear(K),
    ClearMany(Vec<K>),
    ClearAll,
    Stats(oneshot::Sender<BatchStats>),
}

#[derive(Debug)]
pub enum LoadRequest<K, V> {
    One(K, oneshot::Sender<LoadResult<V>>),
    Many(Vec<K>, oneshot::Sender<Vec<LoadResult<V>>>),
}

impl<K, V> LoadRequest<K, V>
where
    V: Send + Clone + std::fmt::Debug,
{
    pub fn keys(&self) -> &[K] {
        match self {
            LoadRequest::One(ref key, _) => slice::from_ref(key),
            LoadRequest::Many(ref keys, _) => keys,
        }
    }

    /// Answers the requester. A key with no cached slot resolves to `Ok(None)`.
    pub fn send_response<'a, I>(self, values: I)
    where
        I: IntoIterator<Item = Option<&'a LoadResult<V>>>,
        V: Send + 'a,
    {
        match self {
            LoadRequest::One(_, response_tx) => {
                let response = values.into_iter().next().flatten().cloned().unwrap_or(Ok(None));
                if let Err(e) = response_tx.send(response) {
                    tracing::warn!(?e, "receiver dropped");
                }
            }
            LoadRequest::Many(_, response_tx) => {
                let response = values
                    .into_iter()
                    .map(|slot| slot.cloned().unwrap_or(Ok(None)))
                    .collect::<Vec<_>>();
                if let Err(e) = response_tx.send(response) {
                    tracing::warn!(?e, "receiver dropped");
                }
            }
        }
    }
}
