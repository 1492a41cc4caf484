use std::collections::HashSet;
use std::hash::Hash;

use crate::loader_op::LoadRequest;

/// Accumulates the load requests that miss the cache during one execution frame.
///
/// Each key is staged at most once no matter how many requests ask for it, so a key requested
/// twice before the flush resolves from a single slot in a single bulk fetch.
#[derive(Debug)]
pub struct KeyCollector<K, V> {
    keys: Vec<K>,
    staged: HashSet<K>,
    requests: Vec<LoadRequest<K, V>>,
}

impl<K, V> Default for KeyCollector<K, V> {
    fn default() -> Self {
        Self { keys: Vec::new(), staged: HashSet::new(), requests: Vec::new() }
    }
}

impl<K, V> KeyCollector<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Records `request` as waiting on this batch and stages whichever of `missing` keys are not
    /// staged yet, in first-seen order.
    pub fn stage<I>(&mut self, request: LoadRequest<K, V>, missing: I)
    where
        I: IntoIterator<Item = K>,
    {
        for key in missing {
            if self.staged.insert(key.clone()) {
                self.keys.push(key);
            }
        }
        self.requests.push(request);
    }

    pub fn is_staged(&self, key: &K) -> bool {
        self.staged.contains(key)
    }

    /// True when no request is waiting on a flush.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of distinct keys staged.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Drains the batch, returning the staged keys and the requests waiting on them.
    pub fn take(&mut self) -> (Vec<K>, Vec<LoadRequest<K, V>>) {
        self.staged.clear();
        (std::mem::take(&mut self.keys), std::mem::take(&mut self.requests))
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    fn one(key: u32) -> LoadRequest<u32, String> {
        let (tx, _rx) = oneshot::channel();
        LoadRequest::One(key, tx)
    }

    #[test]
    fn stages_each_key_once_in_first_seen_order() {
        let mut collector = KeyCollector::default();
        collector.stage(one(7), [7]);
        collector.stage(one(3), [3]);
        collector.stage(one(7), [7]);
        let (tx, _rx) = oneshot::channel();
        collector.stage(LoadRequest::Many(vec![3, 9], tx), [3, 9]);

        assert!(collector.is_staged(&9));
        assert_eq!(collector.len(), 3);

        let (keys, requests) = collector.take();
        assert_eq!(keys, vec![7, 3, 9]);
        assert_eq!(requests.len(), 4);
        assert!(collector.is_empty());
        assert!(!collector.is_staged(&7));
    }
}
