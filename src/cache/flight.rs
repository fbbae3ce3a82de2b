//! In-flight request deduplication.
//!
//! The first caller for a key installs a shared future before any await
//! point; every concurrent caller for the same key awaits that same future
//! and observes the identical result. The slot is released when the leading
//! call completes, whether it succeeded, failed, or was cancelled.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type SharedLoad<T> = Shared<BoxFuture<'static, T>>;

/// Deduplicates concurrent asynchronous computations by key.
pub struct Flight<K, T>
where
    K: Eq + Hash,
{
    slots: Arc<DashMap<K, SharedLoad<T>>>,
}

impl<K, T> Flight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }

    /// Join the in-flight computation for `key`, or start one via `start`.
    ///
    /// `start` is only invoked when no computation for the key is underway.
    /// The slot is installed synchronously, so two tasks racing on the same
    /// key can never both become the leader.
    pub async fn run<F>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        use dashmap::mapref::entry::Entry;

        let (shared, guard) = match self.slots.entry(key.clone()) {
            Entry::Occupied(occupied) => (occupied.get().clone(), None),
            Entry::Vacant(vacant) => {
                let shared = start().shared();
                vacant.insert(shared.clone());
                let guard = FlightGuard {
                    key,
                    slots: Arc::clone(&self.slots),
                };
                (shared, Some(guard))
            }
        };

        let value = shared.await;
        drop(guard);
        value
    }

    /// Number of keys with a computation currently underway.
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

impl<K, T> Default for Flight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Releases the in-flight slot when the leading call finishes or is dropped.
struct FlightGuard<K, T>
where
    K: Eq + Hash,
{
    key: K,
    slots: Arc<DashMap<K, SharedLoad<T>>>,
}

impl<K, T> Drop for FlightGuard<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.slots.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let flight: Arc<Flight<&'static str, u64>> = Arc::new(Flight::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let leader = {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                flight
                    .run("projects", move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            let _ = gate.await;
                            42
                        }
                        .boxed()
                    })
                    .await
            })
        };

        // Wait until the leader has installed its slot.
        while flight.in_flight() == 0 {
            tokio::task::yield_now().await;
        }

        let follower = {
            let flight = Arc::clone(&flight);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                flight
                    .run("projects", move || {
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            7
                        }
                        .boxed()
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        release.send(()).expect("leader still waiting");

        let first = leader.await.expect("leader completes");
        let second = follower.await.expect("follower completes");

        assert_eq!(first, 42);
        assert_eq!(second, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn sequential_calls_compute_independently() {
        let flight: Flight<&'static str, u64> = Flight::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for expected in 1..=3 {
            let calls = Arc::clone(&calls);
            let value = flight
                .run("pages", move || {
                    async move { calls.fetch_add(1, Ordering::SeqCst) as u64 + 1 }.boxed()
                })
                .await;
            assert_eq!(value, expected);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share() {
        let flight: Flight<&'static str, &'static str> = Flight::new();

        let a = flight.run("a", || async { "alpha" }.boxed()).await;
        let b = flight.run("b", || async { "beta" }.boxed()).await;

        assert_eq!(a, "alpha");
        assert_eq!(b, "beta");
    }

    #[tokio::test]
    async fn slot_is_released_after_failure_outcome() {
        let flight: Flight<&'static str, Result<u64, &'static str>> = Flight::new();

        let failed = flight.run("k", || async { Err("load failed") }.boxed()).await;
        assert!(failed.is_err());
        assert_eq!(flight.in_flight(), 0);

        let ok = flight.run("k", || async { Ok(9) }.boxed()).await;
        assert_eq!(ok, Ok(9));
    }
}
