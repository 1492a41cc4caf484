use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use futures::future::join_all;

use crate::batch_function::{Batch, BatchFunction};
use crate::error::{LoadError, LoadResult};

/// Issues the bulk fetch for a flushed batch and splits the answer back per key.
pub struct BatchExecutor<F, ContextT> {
    context: ContextT,
    max_batch_size: Option<usize>,
    phantom_batch_function: PhantomData<fn() -> F>,
}

impl<F, ContextT> BatchExecutor<F, ContextT> {
    pub fn new(context: ContextT, max_batch_size: Option<usize>) -> Self {
        Self {
            context,
            max_batch_size: max_batch_size.filter(|size| *size > 0),
            phantom_batch_function: PhantomData,
        }
    }

    /// Number of bulk fetches that `execute` will issue for `unique_keys` keys.
    pub fn fetch_count(&self, unique_keys: usize) -> usize {
        match self.max_batch_size {
            _ if unique_keys == 0 => 0,
            Some(size) => unique_keys.div_ceil(size),
            None => 1,
        }
    }
}

impl<F, ContextT> BatchExecutor<F, ContextT>
where
    ContextT: Send + Sync,
{
    /// Loads `keys` and returns one result per distinct key, in first-seen order.
    ///
    /// Without a `max_batch_size` the batch function is called exactly once.
    pub async fn execute<K, V>(&self, keys: Vec<K>) -> Vec<(K, LoadResult<V>)>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync,
        V: Clone + Send,
        F: BatchFunction<K, V, Context = ContextT>,
    {
        let keys = distinct(keys);
        if keys.is_empty() {
            return Vec::new();
        }
        let chunk_size = self.max_batch_size.unwrap_or(keys.len());
        let loads = keys.chunks(chunk_size).map(|chunk| async move {
            tracing::debug!(chunk_len = chunk.len(), "bulk fetch");
            match F::load(chunk, &self.context).await {
                Ok(batch) => split_back(chunk, batch),
                Err(e) => {
                    tracing::warn!(error = %e, keys = ?chunk, "bulk fetch failed");
                    chunk.iter().map(|k| (k.clone(), Err(e.clone()))).collect()
                }
            }
        });
        join_all(loads).await.into_iter().flatten().collect()
    }
}

fn distinct<K: Eq + Hash + Clone>(keys: Vec<K>) -> Vec<K> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

/// Pairs every key with its slice of `batch`, preserving the order of `keys`.
pub fn split_back<K, V>(keys: &[K], batch: Batch<K, V>) -> Vec<(K, LoadResult<V>)>
where
    K: Eq + Hash + Clone,
{
    match batch {
        Batch::Aligned(slots) if slots.len() != keys.len() => {
            let e = LoadError::Misaligned { expected: keys.len(), actual: slots.len() };
            keys.iter().map(|k| (k.clone(), Err(e.clone()))).collect()
        }
        Batch::Aligned(slots) => keys.iter().cloned().zip(slots).collect(),
        Batch::Keyed(pairs) => {
            let mut loaded = pairs.into_iter().collect::<HashMap<_, _>>();
            keys.iter().map(|k| (k.clone(), Ok(loaded.remove(k)))).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<u32>>>,
    }

    struct Doubler;

    #[async_trait]
    impl BatchFunction<u32, u32> for Doubler {
        type Context = Recorder;
        async fn load(keys: &[u32], context: &Recorder) -> Result<Batch<u32, u32>, LoadError> {
            context.calls.fetch_add(1, Ordering::SeqCst);
            context.seen.lock().unwrap().push(keys.to_vec());
            // Reverse to mimic a store returning rows in its own order.
            Ok(Batch::Keyed(keys.iter().rev().filter(|k| **k != 0).map(|k| (*k, k * 2)).collect()))
        }
    }

    #[tokio::test]
    async fn duplicate_keys_are_fetched_once_in_request_order() {
        let executor = BatchExecutor::<Doubler, _>::new(Recorder::default(), None);
        let results = executor.execute(vec![4, 1, 4, 0]).await;

        let results = results.into_iter().map(|(k, v)| (k, v.unwrap())).collect::<Vec<_>>();
        assert_eq!(results, vec![(4, Some(8)), (1, Some(2)), (0, None)]);
        assert_eq!(executor.context.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*executor.context.seen.lock().unwrap(), vec![vec![4, 1, 0]]);
    }

    #[tokio::test]
    async fn max_batch_size_splits_into_chunks() {
        let executor = BatchExecutor::<Doubler, _>::new(Recorder::default(), Some(2));
        let results = executor.execute(vec![1, 2, 3, 4, 5]).await;

        assert_eq!(results.len(), 5);
        assert_eq!(executor.fetch_count(5), 3);
        assert_eq!(executor.context.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn misaligned_batch_fails_every_key() {
        let results = split_back(&[1, 2], Batch::<u32, u32>::Aligned(vec![Ok(Some(1))]));
        assert!(results
            .iter()
            .all(|(_, r)| matches!(r, Err(LoadError::Misaligned { expected: 2, actual: 1 }))));
    }

    #[test]
    fn aligned_batch_keeps_per_key_errors() {
        let batch =
            Batch::<u32, u32>::Aligned(vec![Ok(Some(1)), Err(LoadError::key("bad")), Ok(None)]);
        let results = split_back(&[1, 2, 3], batch);
        assert!(matches!(results[0], (1, Ok(Some(1)))));
        assert!(matches!(results[1], (2, Err(LoadError::Key { .. }))));
        assert!(matches!(results[2], (3, Ok(None))));
    }
}
