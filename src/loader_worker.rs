use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use futures::future::FutureExt;
use tokio::sync::mpsc;

use crate::{
    batch_function::BatchFunction,
    cache::Cache,
    collector::KeyCollector,
    error::LoadResult,
    executor::BatchExecutor,
    loader_op::{LoadRequest, LoaderOp},
    worker_stats::WorkerStats,
};

/// The task behind a [`crate::Loader`]. It owns the cache and the pending batch, so neither needs
/// a lock, and it runs until the loader aborts its `JoinHandle` or drops the sending half of the
/// op queue.
///
/// Each pass through the loop is an "execution frame" with three phases: idle until an op
/// arrives, drain the queue while staging keys, then run the batch function once for the staged
/// keys.
///
/// After the first op of a frame the worker sleeps for the batch delay, if there is one, then
/// alternates between yielding to the scheduler and draining the queue until a yield brings in
/// nothing new. Waiters of an upstream loader are answered one channel at a time, and on a
/// multi-thread runtime they resume on other threads while the answers are still going out, so
/// a frame stays open for as long as their loads keep arriving. Draining never awaits: primes
/// and clears go straight to the cache, loads fully answered by the cache are replied to at once,
/// and the remaining keys are staged in the [`KeyCollector`].
///
/// The flush hands the staged keys to the [`BatchExecutor`], memoizes every per-key outcome
/// (absences and errors included) and answers each waiting request from the cache.
pub struct LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Clone + Debug + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = LoadResult<V>>,
    ContextT: Send + Sync + 'static,
{
    cache: CacheT,
    request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
    collector: KeyCollector<K, V>,
    executor: BatchExecutor<F, ContextT>,
    batch_delay: Option<Duration>,
    stats: WorkerStats,
}

impl<K, V, F, CacheT, ContextT> LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Clone + Debug + Send + Sync,
    V: 'static + Send + Debug + Clone,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = LoadResult<V>>,
    ContextT: Send + Sync + 'static,
{
    pub fn new(
        cache: CacheT,
        request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
        executor: BatchExecutor<F, ContextT>,
        batch_delay: Option<Duration>,
        tag: &'static str,
    ) -> Self {
        Self {
            cache,
            request_rx,
            collector: KeyCollector::default(),
            executor,
            batch_delay,
            stats: WorkerStats::new(tag),
        }
    }

    pub async fn start(mut self) {
        loop {
            // Idle until the first op of the frame.
            match self.request_rx.recv().await {
                None => {
                    tracing::debug!("Tx channel closed. Terminating LoaderWorker.");
                    return;
                }
                Some(op) => self.mux_op(op),
            }
            if let Some(delay) = self.batch_delay {
                tokio::time::sleep(delay).await;
            }
            // The frame closes only after a pass over the scheduler that queued nothing new.
            loop {
                tokio::task::yield_now().await;
                if !self.drain() {
                    break;
                }
            }
            if !self.collector.is_empty() {
                self.execute_load().await;
            }
        }
    }

    /// Handles every op already queued without awaiting. Returns whether there was any.
    fn drain(&mut self) -> bool {
        let mut drained = false;
        while let Some(Some(op)) = self.request_rx.recv().now_or_never() {
            self.mux_op(op);
            drained = true;
        }
        drained
    }

    #[tracing::instrument(skip(self))]
    fn mux_op(&mut self, op: LoaderOp<K, V>) {
        match op {
            LoaderOp::Load(request) => self.stage_load(request),
            LoaderOp::Prime(key, value) => self.prime(key, value),
            LoaderOp::PrimeMany(key_vals) => {
                for (key, value) in key_vals {
                    self.prime(key, value);
                }
            }
            LoaderOp::Clear(key) => self.cache.remove(std::slice::from_ref(&key)),
            LoaderOp::ClearMany(keys) => self.cache.remove(&keys),
            LoaderOp::ClearAll => self.cache.flush(),
            LoaderOp::Stats(response_tx) => {
                if let Err(stats) = response_tx.send(self.stats.snapshot()) {
                    tracing::warn!(?stats, "receiver dropped");
                }
            }
        }
    }

    fn stage_load(&mut self, request: LoadRequest<K, V>) {
        let keys_to_load = request
            .keys()
            .iter()
            .filter(|k| !self.cache.contains(k))
            .cloned()
            .collect::<Vec<_>>();
        let requested = request.keys().len();
        self.stats.record_load_request(requested);
        self.stats.record_cache_hits(requested - keys_to_load.len());
        tracing::debug!(requested_keys = ?request.keys(), ?keys_to_load);
        if keys_to_load.is_empty() {
            let values = self.cache.get_many(request.keys());
            request.send_response(values);
        } else {
            self.collector.stage(request, keys_to_load);
        }
    }

    /// Primes never replace a resolved entry, nor one waiting on the pending batch.
    fn prime(&mut self, key: K, value: V) {
        if self.collector.is_staged(&key) || !self.cache.insert_if_absent(key, Ok(Some(value))) {
            tracing::trace!("prime ignored, key already resolved or pending");
            self.stats.record_ignored_prime();
        }
    }

    #[tracing::instrument(skip(self))]
    async fn execute_load(&mut self) {
        tracing::trace!(staged = self.collector.len(), "flushing");
        let (keys, requests) = self.collector.take();
        self.stats.record_flush(keys.len(), self.executor.fetch_count(keys.len()));
        let loaded = self.executor.execute(keys).await;
        tracing::debug!(loaded = loaded.len(), waiting = requests.len());
        self.cache.insert_many(loaded);

        for request in requests {
            let values = self.cache.get_many(request.keys());
            request.send_response(values);
        }
    }
}
