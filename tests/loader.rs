use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::future;
use graphload::{Batch, BatchFunction, LoadError, Loader, LoaderConfig};
use pretty_assertions::assert_eq;

#[derive(Debug, PartialEq, Eq, Clone)]
struct DummyData(String);

#[derive(Debug, thiserror::Error)]
#[error("dummy store is down")]
struct DummyStoreDown;

#[derive(Default)]
struct DummyContext {
    map: HashMap<i64, String>,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<i64>>>,
    down: AtomicBool,
}

impl DummyContext {
    fn with(entries: &[(i64, &str)]) -> Self {
        Self {
            map: entries.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            ..Default::default()
        }
    }

    fn record(&self, keys: &[i64]) -> Result<(), LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.lock().unwrap().push(keys.to_vec());
        if self.down.load(Ordering::SeqCst) {
            return Err(LoadError::fetch(DummyStoreDown));
        }
        Ok(())
    }
}

struct DummyDataLoader;

#[async_trait]
impl BatchFunction<i64, DummyData> for DummyDataLoader {
    type Context = DummyContext;
    async fn load(
        keys: &[i64],
        context: &DummyContext,
    ) -> Result<Batch<i64, DummyData>, LoadError> {
        context.record(keys)?;
        Ok(keys
            .iter()
            .filter_map(|k| context.map.get(k).cloned().map(|v| (*k, DummyData(v))))
            .collect::<Vec<_>>()
            .into())
    }
}

/// Answers positionally and rejects negative keys individually.
struct PositiveOnly;

#[async_trait]
impl BatchFunction<i64, DummyData> for PositiveOnly {
    type Context = DummyContext;
    async fn load(
        keys: &[i64],
        context: &DummyContext,
    ) -> Result<Batch<i64, DummyData>, LoadError> {
        context.record(keys)?;
        Ok(Batch::Aligned(
            keys.iter()
                .map(|k| match *k {
                    k if k < 0 => Err(LoadError::key(format!("negative key {}", k))),
                    k => Ok(context.map.get(&k).cloned().map(DummyData)),
                })
                .collect(),
        ))
    }
}

/// Forgets the last key of every batch.
struct ShortBatch;

#[async_trait]
impl BatchFunction<i64, DummyData> for ShortBatch {
    type Context = DummyContext;
    async fn load(keys: &[i64], _: &DummyContext) -> Result<Batch<i64, DummyData>, LoadError> {
        Ok(Batch::Aligned(keys.iter().skip(1).map(|_| Ok(None)).collect()))
    }
}

struct Panicking;

#[async_trait]
impl BatchFunction<i64, DummyData> for Panicking {
    type Context = ();
    async fn load(_: &[i64], _: &()) -> Result<Batch<i64, DummyData>, LoadError> {
        panic!("batch function blew up");
    }
}

fn data(s: &str) -> Option<DummyData> {
    Some(DummyData(s.to_owned()))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[tokio::test]
async fn basic_load() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(42, "Foo")]));
    assert_eq!(loader.load(42).await.unwrap(), data("Foo"));
}

#[tokio::test]
async fn missing_key_is_absent_not_an_error() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(42, "Foo")]));
    assert_eq!(loader.load(7).await.unwrap(), None);
}

#[tokio::test]
async fn repeated_load_hits_the_cache() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(42, "Foo")]));
    assert_eq!(loader.load(42).await.unwrap(), data("Foo"));
    assert_eq!(loader.load(42).await.unwrap(), data("Foo"));

    let stats = loader.stats().await.unwrap();
    assert_eq!(stats.bulk_fetches, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn basic_load_many() {
    let loader = Loader::new(
        DummyDataLoader,
        DummyContext::with(&[
            (42, "one fish"),
            (12, "two fish"),
            (5, "red fish"),
            (8, "blue fish"),
        ]),
    );
    let values = loader.load_many(vec![5, 12, 99, 8]).await;
    assert_eq!(
        values.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![data("red fish"), data("two fish"), None, data("blue fish")]
    );
}

#[tokio::test]
async fn concurrent_loads_share_one_bulk_fetch() {
    init_tracing();
    let loader = Loader::new(
        DummyDataLoader,
        DummyContext::with(&[
            (42, "one fish"),
            (12, "two fish"),
            (5, "red fish"),
            (8, "blue fish"),
        ]),
    );

    let tuple = future::join4(
        loader.load(5),
        loader.load_many(vec![5, 42]),
        loader.load(99),
        loader.load(12),
    )
    .await;

    assert_eq!(tuple.0.unwrap(), data("red fish"));
    assert_eq!(
        tuple.1.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![data("red fish"), data("one fish")]
    );
    assert_eq!(tuple.2.unwrap(), None);
    assert_eq!(tuple.3.unwrap(), data("two fish"));

    let stats = loader.stats().await.unwrap();
    assert_eq!(stats.load_requests, 4);
    assert_eq!(stats.keys_requested, 5);
    assert_eq!(stats.bulk_fetches, 1);
    assert_eq!(stats.keys_fetched, 4);
}

#[tokio::test]
async fn duplicate_keys_in_one_frame_are_fetched_once() {
    let context = DummyContext::with(&[(1, "a"), (2, "b"), (3, "c")]);
    let loader = Loader::new(DummyDataLoader, context);

    let (a, b, a_again, c) =
        future::join4(loader.load(1), loader.load(2), loader.load(1), loader.load(3)).await;
    assert_eq!(a.unwrap(), data("a"));
    assert_eq!(b.unwrap(), data("b"));
    assert_eq!(a_again.unwrap(), data("a"));
    assert_eq!(c.unwrap(), data("c"));

    let stats = loader.stats().await.unwrap();
    assert_eq!(stats.bulk_fetches, 1);
    assert_eq!(stats.max_batch_size, 3);
}

#[tokio::test]
async fn batch_failure_reaches_every_waiter_and_is_memoized() {
    let context = DummyContext::with(&[(1, "a"), (2, "b")]);
    context.down.store(true, Ordering::SeqCst);
    let loader = Loader::new(DummyDataLoader, context);

    let (one, two) = future::join(loader.load(1), loader.load(2)).await;
    assert!(matches!(one, Err(LoadError::Fetch(_))));
    assert!(matches!(two, Err(LoadError::Fetch(_))));

    // The failure is cached for the lifetime of the loader.
    assert!(matches!(loader.load(1).await, Err(LoadError::Fetch(_))));
    assert_eq!(loader.stats().await.unwrap().bulk_fetches, 1);
}

#[tokio::test]
async fn per_key_errors_only_fail_their_key() {
    let loader = Loader::new(PositiveOnly, DummyContext::with(&[(1, "a")]));

    let values = loader.load_many(vec![1, -4, 2]).await;
    assert_eq!(values[0].as_ref().unwrap(), &data("a"));
    assert!(matches!(&values[1], Err(LoadError::Key { message }) if message == "negative key -4"));
    assert_eq!(values[2].as_ref().unwrap(), &None);
}

#[tokio::test]
async fn misaligned_batch_fails_the_whole_batch() {
    let loader = Loader::new(ShortBatch, DummyContext::default());

    let values = loader.load_many(vec![1, 2, 3]).await;
    assert!(values
        .iter()
        .all(|v| matches!(v, Err(LoadError::Misaligned { expected: 3, actual: 2 }))));
}

#[tokio::test]
async fn primed_value_is_served_without_fetching() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(1, "from store")]));
    loader.prime(1, DummyData("primed".to_owned())).unwrap();

    assert_eq!(loader.load(1).await.unwrap(), data("primed"));
    assert_eq!(loader.stats().await.unwrap().bulk_fetches, 0);
}

#[tokio::test]
async fn prime_does_not_replace_a_resolved_value() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(1, "from store")]));
    assert_eq!(loader.load(1).await.unwrap(), data("from store"));

    loader.prime(1, DummyData("primed".to_owned())).unwrap();
    assert_eq!(loader.load(1).await.unwrap(), data("from store"));
    assert_eq!(loader.stats().await.unwrap().primes_ignored, 1);
}

#[tokio::test]
async fn prime_does_not_replace_a_pending_load() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(1, "from store")]));

    let (value, primed) = future::join(loader.load(1), async {
        loader.prime(1, DummyData("primed".to_owned()))
    })
    .await;

    primed.unwrap();
    assert_eq!(value.unwrap(), data("from store"));
    assert_eq!(loader.load(1).await.unwrap(), data("from store"));
    assert_eq!(loader.stats().await.unwrap().primes_ignored, 1);
}

#[tokio::test]
async fn prime_many_fills_only_absent_keys() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(1, "a"), (2, "b")]));
    assert_eq!(loader.load(1).await.unwrap(), data("a"));

    loader
        .prime_many(vec![(1, DummyData("x".to_owned())), (2, DummyData("y".to_owned()))])
        .unwrap();
    let values = loader.load_many(vec![1, 2]).await;
    assert_eq!(
        values.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![data("a"), data("y")]
    );
}

#[tokio::test]
async fn clear_forces_a_refetch() {
    let loader = Loader::new(DummyDataLoader, DummyContext::with(&[(1, "a"), (2, "b")]));
    loader.load_many(vec![1, 2]).await;

    loader.clear(1).unwrap();
    assert_eq!(loader.load(1).await.unwrap(), data("a"));
    assert_eq!(loader.load(2).await.unwrap(), data("b"));

    loader.clear_all().unwrap();
    loader.load_many(vec![1, 2]).await;

    let stats = loader.stats().await.unwrap();
    assert_eq!(stats.bulk_fetches, 3);
    assert_eq!(stats.keys_fetched, 5);
}

#[tokio::test]
async fn max_batch_size_splits_a_flush() {
    let config = LoaderConfig { max_batch_size: Some(2), ..Default::default() };
    let loader = Loader::with_config(
        DummyDataLoader,
        DummyContext::with(&[(1, "a"), (2, "b"), (3, "c"), (4, "d"), (5, "e")]),
        config,
    );

    let values = loader.load_many(vec![5, 4, 3, 2, 1]).await;
    assert_eq!(
        values.into_iter().map(Result::unwrap).collect::<Vec<_>>(),
        vec![data("e"), data("d"), data("c"), data("b"), data("a")]
    );

    let stats = loader.stats().await.unwrap();
    assert_eq!(stats.bulk_fetches, 3);
    assert_eq!(stats.max_batch_size, 5);
}

#[tokio::test]
async fn batch_delay_widens_the_frame() {
    let config = LoaderConfig { batch_delay_ms: Some(20), ..Default::default() };
    let context = DummyContext::with(&[(1, "a"), (2, "b")]);
    let loader = Loader::with_config(DummyDataLoader, context, config);

    let (a, b) = future::join(loader.load(1), async {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        loader.load(2).await
    })
    .await;

    assert_eq!(a.unwrap(), data("a"));
    assert_eq!(b.unwrap(), data("b"));
    assert_eq!(loader.stats().await.unwrap().bulk_fetches, 1);
}

#[tokio::test]
async fn stopped_worker_fails_pending_and_later_calls() {
    let loader = Loader::new(Panicking, ());

    assert!(matches!(loader.load(1).await, Err(LoadError::WorkerStopped)));
    assert!(matches!(loader.prime(1, DummyData("x".to_owned())), Err(LoadError::WorkerStopped)));
    assert!(loader
        .load_many(vec![1, 2])
        .await
        .iter()
        .all(|v| matches!(v, Err(LoadError::WorkerStopped))));
}
