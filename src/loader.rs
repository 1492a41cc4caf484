use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Drop;

use tokio::sync::{mpsc, oneshot};
use tracing_futures::Instrument;

use crate::{
    batch_function::BatchFunction,
    config::LoaderConfig,
    error::{LoadError, LoadResult},
    executor::BatchExecutor,
    loader_op::{LoadRequest, LoaderOp},
    loader_worker::LoaderWorker,
    worker_stats::BatchStats,
};

/// Coalesces single-key lookups into bulk fetches, one relation kind per loader.
///
/// [`Loader::load`] and [`Loader::load_many`] may be called from any number of concurrent
/// resolvers. Each call is queued to the loader's worker task, which groups everything queued in
/// one execution frame into a single call of the [`BatchFunction`] (one per chunk when
/// `max_batch_size` is set) and answers every caller from its cache over a oneshot channel.
/// [`Loader::prime`] and [`Loader::clear`] (and their `_many` forms) edit that cache out-of-band.
///
/// The cache lives as long as the loader. A loader is meant to serve a single top-level request;
/// dropping it stops its worker and discards everything it cached.
pub struct Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    request_tx: mpsc::UnboundedSender<LoaderOp<K, V>>,
    load_task_handle: tokio::task::JoinHandle<()>,
}

impl<K, V> Drop for Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    fn drop(&mut self) {
        self.load_task_handle.abort();
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Hash + Send + Sync,
    V: 'static + Send + Debug + Clone,
{
    /// Creates a new Loader for the provided BatchFunction and Context type.
    ///
    /// Note: the batch function is passed in as a marker for type inference.
    pub fn new<F, ContextT>(batch_fn: F, context: ContextT) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        Self::with_config(batch_fn, context, LoaderConfig::default())
    }

    /// Creates a new Loader with explicit batching settings.
    ///
    /// Must be called from within a tokio runtime, the worker is spawned immediately.
    pub fn with_config<F, ContextT>(_: F, context: ContextT, config: LoaderConfig) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        let tag = std::any::type_name::<F>();
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = LoaderWorker::<K, V, F, HashMap<K, LoadResult<V>>, ContextT>::new(
            HashMap::new(),
            rx,
            BatchExecutor::new(context, config.max_batch_size),
            config.batch_delay(),
            tag,
        );
        let span = tracing::trace_span!("LoaderWorker", batch_fn = tag);
        let load_task_handle = tokio::task::spawn(worker.start().instrument(span));
        Self { request_tx: tx, load_task_handle }
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Clone + Send,
    V: 'static + Send + Debug + Clone,
{
    /// Loads a value from the underlying resource.
    ///
    /// Returns `Ok(None)` if the value could not be loaded by the BatchFunction.
    ///
    /// If the value is already in the loader cache, it is returned as soon as it is processed.
    /// Otherwise, the requested key is enqueued for batch loading in the next loader execution
    /// frame. Errors are cached like values: loading the same key again returns the same error.
    pub async fn load(&self, key: K) -> LoadResult<V> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoaderOp::Load(LoadRequest::One(key, response_tx)))?;
        response_rx.await.map_err(|_| LoadError::WorkerStopped)?
    }

    /// Loads many values at once.
    ///
    /// Returns one result per key, in the order of `keys`.
    ///
    /// If all the values are already present in the loader cache, they are returned as soon as
    /// the request is processed by the worker. Otherwise, the missing keys are enqueued for batch
    /// loading in the next loader execution frame.
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<LoadResult<V>> {
        let len = keys.len();
        let (response_tx, response_rx) = oneshot::channel();
        if let Err(e) = self.send(LoaderOp::Load(LoadRequest::Many(keys, response_tx))) {
            return vec![Err(e); len];
        }
        match response_rx.await {
            Ok(values) => values,
            Err(_) => vec![Err(LoadError::WorkerStopped); len],
        }
    }

    /// Adds a value to the cache.
    ///
    /// Does nothing if the key is already cached or waiting on a pending batch.
    pub fn prime(&self, key: K, value: V) -> Result<(), LoadError> {
        self.send(LoaderOp::Prime(key, value))
    }

    /// Adds many values to the cache at once.
    pub fn prime_many(&self, key_vals: Vec<(K, V)>) -> Result<(), LoadError> {
        self.send(LoaderOp::PrimeMany(key_vals))
    }

    /// Removes a value from the cache.
    ///
    /// This key will be reloaded when it is next requested.
    pub fn clear(&self, key: K) -> Result<(), LoadError> {
        self.send(LoaderOp::Clear(key))
    }

    /// Removes multiple values from the cache at once.
    ///
    /// These keys will be reloaded when requested.
    pub fn clear_many(&self, keys: Vec<K>) -> Result<(), LoadError> {
        self.send(LoaderOp::ClearMany(keys))
    }

    pub fn clear_all(&self) -> Result<(), LoadError> {
        self.send(LoaderOp::ClearAll)
    }

    /// Returns the worker's counters as of the moment the request is processed.
    pub async fn stats(&self) -> Result<BatchStats, LoadError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.send(LoaderOp::Stats(response_tx))?;
        response_rx.await.map_err(|_| LoadError::WorkerStopped)
    }

    fn send(&self, op: LoaderOp<K, V>) -> Result<(), LoadError> {
        self.request_tx.send(op).map_err(|_| LoadError::WorkerStopped)
    }
}
