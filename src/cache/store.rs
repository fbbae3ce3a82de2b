//! TTL-bound keyed storage.
//!
//! Entries carry the instant they were stored; a read only returns entries
//! younger than the configured time-to-live. Expired entries are retained
//! until swept so the fallback chain can still serve them when the store is
//! unreachable.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// In-memory keyed cache with a fixed time-to-live.
pub struct TtlStore<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached value if it is still fresh.
    pub fn get(&self, key: &K) -> Option<V> {
        let guard = rw_read(&self.entries, SOURCE, "get");
        guard
            .get(key)
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| entry.value.clone())
    }

    /// Return the cached value regardless of age. Used by the fallback chain
    /// when a load fails and a previously seen value beats a bundled default.
    pub fn get_stale(&self, key: &K) -> Option<V> {
        let guard = rw_read(&self.entries, SOURCE, "get_stale");
        guard.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let mut guard = rw_write(&self.entries, SOURCE, "insert");
        guard.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn remove(&self, key: &K) {
        rw_write(&self.entries, SOURCE, "remove").remove(key);
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    /// Drop every expired entry; returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let mut guard = rw_write(&self.entries, SOURCE, "purge_expired");
        let before = guard.len();
        guard.retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before - guard.len()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_fresh(&self, entry: &Entry<V>) -> bool {
        !self.ttl.is_zero() && entry.stored_at.elapsed() < self.ttl
    }
}
