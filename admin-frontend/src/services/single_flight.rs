//! Request coalescing: concurrent callers asking for the same key share one
//! execution of the underlying future.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FlightError {
    #[error("in-flight task panicked")]
    Panicked,

    #[error("in-flight task was cancelled")]
    Cancelled,
}

type Flight<T> = Shared<BoxFuture<'static, Result<T, FlightError>>>;

/// What a caller of [`SingleFlight::run`] gets back.
#[derive(Debug)]
pub struct FlightResult<T> {
    pub value: Result<T, FlightError>,
    /// `true` when the caller joined an execution someone else started.
    pub joined: bool,
}

struct Slot<T> {
    generation: u64,
    flight: Flight<T>,
}

struct Flights<K, T> {
    next_generation: u64,
    slots: HashMap<K, Slot<T>>,
}

/// A per-key cell that is either idle or holds one in-flight shared execution.
///
/// Each execution runs on its own tokio task, so it finishes and frees its
/// slot even when every caller waiting on it has been dropped.
pub struct SingleFlight<K, T> {
    flights: Arc<Mutex<Flights<K, T>>>,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(Flights {
                next_generation: 0,
                slots: HashMap::new(),
            })),
        }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn is_in_flight(&self, key: &K) -> bool {
        lock(&self.flights).slots.contains_key(key)
    }

    /// Detach the execution in flight for `key`, if any.
    ///
    /// Callers already waiting still get its result; the next `run` starts
    /// a fresh execution.
    pub fn forget(&self, key: &K) {
        lock(&self.flights).slots.remove(key);
    }

    /// Join the execution in flight for `key`, or spawn one with `make`.
    ///
    /// `make` is only invoked when no execution is in flight. Must be called
    /// from within a tokio runtime.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> FlightResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight, joined) = {
            let mut flights = lock(&self.flights);

            let existing = flights.slots.get(&key).map(|slot| slot.flight.clone());
            match existing {
                Some(flight) => (flight, true),
                None => {
                    let generation = flights.next_generation;
                    flights.next_generation = flights.next_generation.wrapping_add(1);

                    let guard = ClearSlot {
                        flights: Arc::clone(&self.flights),
                        key: key.clone(),
                        generation,
                    };
                    let work = make();
                    // The guard lives in the task, which tokio drops on
                    // completion, panic or runtime shutdown.
                    let task = tokio::spawn(async move {
                        let _guard = guard;
                        work.await
                    });
                    let flight = async move {
                        task.await.map_err(|e| {
                            if e.is_panic() {
                                FlightError::Panicked
                            } else {
                                FlightError::Cancelled
                            }
                        })
                    }
                    .boxed()
                    .shared();

                    flights.slots.insert(
                        key,
                        Slot {
                            generation,
                            flight: flight.clone(),
                        },
                    );
                    (flight, false)
                }
            }
        };

        FlightResult {
            value: flight.await,
            joined,
        }
    }
}

fn lock<K, T>(flights: &Mutex<Flights<K, T>>) -> MutexGuard<'_, Flights<K, T>> {
    // A panic while holding the lock cannot leave the map half-updated.
    flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Frees the slot when the execution's task ends, unless the slot has since
/// been forgotten and reused.
struct ClearSlot<K: Eq + Hash, T> {
    flights: Arc<Mutex<Flights<K, T>>>,
    key: K,
    generation: u64,
}

impl<K: Eq + Hash, T> Drop for ClearSlot<K, T> {
    fn drop(&mut self) {
        let mut flights = lock(&self.flights);
        if flights
            .slots
            .get(&self.key)
            .is_some_and(|slot| slot.generation == self.generation)
        {
            flights.slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    async fn wait_until_idle<K, T>(flights: &SingleFlight<K, T>, key: &K)
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        T: Clone + Send + Sync + 'static,
    {
        tokio::time::timeout(Duration::from_secs(1), async {
            while flights.is_in_flight(key) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("slot was never cleared");
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_execution() {
        let flights: SingleFlight<&'static str, bool> = SingleFlight::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();

        let first = flights.run("admin", {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = gate.await;
                true
            }
        });
        let second = flights.run("admin", {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                false
            }
        });

        let (a, b, _) = tokio::join!(first, second, async {
            tokio::task::yield_now().await;
            let _ = release.send(());
        });

        assert!(a.value.unwrap());
        assert!(b.value.unwrap());
        assert!(!a.joined);
        assert!(b.joined);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        wait_until_idle(&flights, &"admin").await;
    }

    #[tokio::test]
    async fn keys_do_not_coalesce_with_each_other() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();

        let (a, b) = tokio::join!(
            flights.run("admin", || async { 1 }),
            flights.run("chef", || async { 2 })
        );

        assert_eq!((a.value.unwrap(), b.value.unwrap()), (1, 2));
        assert!(!a.joined && !b.joined);
    }

    #[tokio::test]
    async fn slot_resets_after_completion() {
        let flights: SingleFlight<u8, u32> = SingleFlight::new();

        assert_eq!(flights.run(0, || async { 1 }).await.value.unwrap(), 1);
        wait_until_idle(&flights, &0).await;
        let second = flights.run(0, || async { 2 }).await;
        assert_eq!(second.value.unwrap(), 2);
        assert!(!second.joined);
    }

    #[tokio::test]
    async fn panic_is_reported_and_slot_resets() {
        let flights: SingleFlight<u8, u32> = SingleFlight::new();

        let result = flights
            .run(0, || async {
                let fail = true;
                if fail {
                    panic!("refresh blew up");
                }
                0
            })
            .await;
        assert!(matches!(result.value, Err(FlightError::Panicked)));

        wait_until_idle(&flights, &0).await;
        assert_eq!(flights.run(0, || async { 7 }).await.value.unwrap(), 7);
    }

    #[tokio::test]
    async fn execution_outlives_dropped_callers() {
        let flights: SingleFlight<u8, u32> = SingleFlight::new();
        let (release, gate) = oneshot::channel::<()>();

        let waited = tokio::time::timeout(
            Duration::from_millis(20),
            flights.run(0, move || async move {
                let _ = gate.await;
                1
            }),
        )
        .await;
        assert!(waited.is_err());
        assert!(flights.is_in_flight(&0));

        release.send(()).unwrap();
        wait_until_idle(&flights, &0).await;

        let next = flights.run(0, || async { 2 }).await;
        assert_eq!(next.value.unwrap(), 2);
        assert!(!next.joined);
    }

    #[tokio::test]
    async fn forget_starts_a_fresh_execution() {
        let flights: Arc<SingleFlight<u8, u32>> = Arc::new(SingleFlight::new());
        let (release, gate) = oneshot::channel::<()>();

        let stale = tokio::spawn({
            let flights = Arc::clone(&flights);
            async move {
                flights
                    .run(0, move || async move {
                        let _ = gate.await;
                        1
                    })
                    .await
            }
        });
        while !flights.is_in_flight(&0) {
            tokio::task::yield_now().await;
        }

        flights.forget(&0);
        let fresh = flights.run(0, || async { 2 }).await;
        assert_eq!(fresh.value.unwrap(), 2);
        assert!(!fresh.joined);

        release.send(()).unwrap();
        assert_eq!(stale.await.unwrap().value.unwrap(), 1);
        wait_until_idle(&flights, &0).await;
    }
}
