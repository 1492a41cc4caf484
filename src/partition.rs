//! Helpers that turn an unordered record set returned by a store into a [`Batch`].
//!
//! Stores return rows in whatever order they like, and one-to-many relations return several rows
//! per key. These helpers associate every row with the key it answers so the executor can hand
//! each caller its own slice.

use std::collections::HashMap;
use std::hash::Hash;

use crate::batch_function::Batch;

/// Partitions a one-to-one relation: each record answers the key returned by `key_of`.
///
/// If several records map to the same key, the last one wins.
pub fn index_by<K, R, F>(records: impl IntoIterator<Item = R>, key_of: F) -> Batch<K, R>
where
    F: Fn(&R) -> K,
{
    Batch::Keyed(records.into_iter().map(|record| (key_of(&record), record)).collect())
}

/// Partitions a one-to-many relation into one list per requested key.
///
/// Every key receives a list, empty when no record matched. Within a list records keep the order
/// in which the store returned them. Records whose key was not requested are dropped.
pub fn group_by<K, R, V, FK, FV>(
    keys: &[K],
    records: impl IntoIterator<Item = R>,
    key_of: FK,
    value_of: FV,
) -> Batch<K, Vec<V>>
where
    K: Eq + Hash,
    FK: Fn(&R) -> K,
    FV: Fn(R) -> V,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::with_capacity(keys.len());
    for record in records {
        groups.entry(key_of(&record)).or_default().push(value_of(record));
    }
    Batch::Aligned(
        keys.iter().map(|key| Ok(Some(groups.remove(key).unwrap_or_default()))).collect(),
    )
}
