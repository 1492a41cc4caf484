/// Counters kept by a loader worker for the lifetime of its request.
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Human readable name used to identify this worker stats when it is reported.
    tag: &'static str,
    stats: BatchStats,
}

/// A snapshot of a worker's counters, returned by [`crate::Loader::stats`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchStats {
    /// Number of `LoaderOp::Load` that were received by the worker.
    pub load_requests: u32,
    /// The total number of keys that were requested for loading (not necessarily unique).
    pub keys_requested: u32,
    /// The number of keys that were immediately found in the loader cache.
    pub cache_hits: u32,
    /// Number of calls made to the batch function.
    pub bulk_fetches: u32,
    /// The total number of unique keys handed to the batch function.
    pub keys_fetched: u32,
    /// The max number of unique keys fetched during a single flush.
    pub max_batch_size: u32,
    /// Number of primes that were ignored because the key was already resolved or pending.
    pub primes_ignored: u32,
}

impl WorkerStats {
    pub fn new(tag: &'static str) -> Self {
        Self { tag, stats: BatchStats::default() }
    }

    pub fn record_load_request(&mut self, keys_requested: usize) {
        self.stats.load_requests += 1;
        self.stats.keys_requested += keys_requested as u32;
    }

    pub fn record_cache_hits(&mut self, hits: usize) {
        self.stats.cache_hits += hits as u32;
    }

    pub fn record_flush(&mut self, unique_keys: usize, bulk_fetches: usize) {
        let unique_keys = unique_keys as u32;
        self.stats.bulk_fetches += bulk_fetches as u32;
        self.stats.keys_fetched += unique_keys;
        if unique_keys > self.stats.max_batch_size {
            self.stats.max_batch_size = unique_keys;
        }
    }

    pub fn record_ignored_prime(&mut self) {
        self.stats.primes_ignored += 1;
    }

    pub fn snapshot(&self) -> BatchStats {
        self.stats
    }
}

impl Drop for WorkerStats {
    fn drop(&mut self) {
        tracing::debug!(tag = self.tag, worker_stats = ?self.stats);
    }
}
