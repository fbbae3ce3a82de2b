//! Keyed fetch-through cache: TTL store plus in-flight deduplication.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use metrics::counter;

use crate::application::repos::RepoError;

use super::flight::Flight;
use super::store::TtlStore;

/// A load failure shared between every caller that joined the same flight.
pub type SharedRepoError = Arc<RepoError>;

/// Cache for one family of content reads.
///
/// `fetch` resolves in exactly one of three ways:
/// 1. a fresh cached entry, without touching the loader;
/// 2. the result of an in-flight load another caller already started;
/// 3. a new load, whose result is stored with a fresh timestamp.
pub struct FetchCache<K, V>
where
    K: Eq + Hash,
{
    family: &'static str,
    store: Arc<TtlStore<K, V>>,
    flight: Flight<K, Result<V, SharedRepoError>>,
}

impl<K, V> FetchCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(family: &'static str, ttl: Duration) -> Self {
        Self {
            family,
            store: Arc::new(TtlStore::new(ttl)),
            flight: Flight::new(),
        }
    }

    /// Fetch the value for `key`, loading through `load` on a cache miss.
    ///
    /// Concurrent callers for the same key share a single load. A completed
    /// load populates the store before any waiter observes the result, so a
    /// hit immediately after resolution is guaranteed.
    pub async fn fetch<F>(&self, key: K, load: F) -> Result<V, SharedRepoError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<V, RepoError>>,
    {
        if let Some(value) = self.store.get(&key) {
            counter!("atelier_cache_hit_total", "family" => self.family).increment(1);
            return Ok(value);
        }
        counter!("atelier_cache_miss_total", "family" => self.family).increment(1);

        let store = Arc::clone(&self.store);
        let store_key = key.clone();
        self.flight
            .run(key, move || {
                let pending = load();
                async move {
                    match pending.await {
                        Ok(value) => {
                            store.insert(store_key, value.clone());
                            Ok(value)
                        }
                        Err(error) => Err(Arc::new(error)),
                    }
                }
                .boxed()
            })
            .await
    }

    /// Last stored value for `key`, ignoring freshness.
    pub fn stale(&self, key: &K) -> Option<V> {
        self.store.get_stale(key)
    }

    /// Drop the entry for `key`; the next fetch will load regardless of TTL.
    pub fn invalidate(&self, key: &K) {
        self.store.remove(key);
    }

    /// Drop every entry for this family.
    pub fn clear(&self) {
        self.store.clear();
    }

    /// Evict expired entries; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
