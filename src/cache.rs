use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

/// Per-request result storage owned by a single loader worker.
pub trait Cache {
    type K;
    type V;

    fn get(&self, key: &Self::K) -> Option<&Self::V>;

    /// Returns all the values associated with the provided keys in order with their respective
    /// keys.
    fn get_many(&self, keys: &[Self::K]) -> Vec<Option<&Self::V>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    fn contains(&self, key: &Self::K) -> bool {
        self.get(key).is_some()
    }

    fn insert(&mut self, key: Self::K, value: Self::V);
    fn insert_many<I: IntoIterator<Item = (Self::K, Self::V)>>(&mut self, key_vals: I) {
        for (key, value) in key_vals {
            self.insert(key, value);
        }
    }

    /// Inserts `value` only if `key` has no entry yet. Returns whether the value was stored.
    fn insert_if_absent(&mut self, key: Self::K, value: Self::V) -> bool;

    fn remove(&mut self, keys: &[Self::K]);
    fn flush(&mut self);
}

impl<K, V, S: BuildHasher> Cache for HashMap<K, V, S>
where
    K: Eq + Hash,
{
    type K = K;
    type V = V;

    fn get(&self, key: &K) -> Option<&V> {
        HashMap::get(self, key)
    }

    fn insert(&mut self, key: K, value: V) {
        HashMap::insert(self, key, value);
    }

    fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        match self.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(value);
                true
            }
        }
    }

    fn remove(&mut self, keys: &[K]) {
        for key in keys {
            HashMap::remove(self, key);
        }
    }

    fn flush(&mut self) {
        self.clear();
    }
}
