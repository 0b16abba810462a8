// SPDX-License-Identifier: MIT

//! Coalescing of concurrent identical requests
//!
//! While a fetch for a [`RequestKey`] is in flight, every other caller asking
//! for the same key waits for that fetch instead of starting its own. The
//! entry disappears the moment the fetch settles, so this bounds concurrent
//! outbound work per key to one, not the number of fetches over time.
//!
//! Fetches run on their own tokio task: a caller giving up (timeout,
//! cancellation) only detaches that caller, the fetch still completes and
//! unregisters.
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt as _;
use futures::future::{BoxFuture, Shared};
use nodeweave_core::key::RequestKey;
use tracing::trace;

const LOG_TARGET: &str = "nodeweave::dedup";

type SharedFetch<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct InFlight {
    /// Distinguishes a fetch from a later one registered under the same key
    id: u64,
    subscribers: usize,
    /// A `SharedFetch<T, E>`, type-erased so one deduplicator serves all
    /// response types
    fetch: Box<dyn Any + Send + Sync>,
}

type InFlightMap = Arc<Mutex<HashMap<RequestKey, InFlight>>>;

/// Removes the entry of fetch `id` when dropped: on completion, panic, or
/// runtime shutdown
struct Registration {
    in_flight: InFlightMap,
    key: RequestKey,
    id: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().expect("Locking failed");
        if in_flight.get(&self.key).is_some_and(|entry| entry.id == self.id) {
            in_flight.remove(&self.key);
        }
    }
}

/// A caller waiting on fetch `id`; detaches when dropped
struct Subscription {
    in_flight: InFlightMap,
    key: RequestKey,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().expect("Locking failed");
        if let Some(entry) = in_flight
            .get_mut(&self.key)
            .filter(|entry| entry.id == self.id)
        {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }
}

#[derive(Default)]
pub struct Deduplicator {
    in_flight: InFlightMap,
    next_id: AtomicU64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fetcher` for `key`, unless a fetch for `key` is already in flight,
    /// in which case wait for its result instead
    ///
    /// Every caller attached to the same fetch gets an identical clone of its
    /// result, error included.
    pub async fn run<T, E, F, Fut>(&self, key: RequestKey, fetcher: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let fetch = {
            // Lookup and registration happen under one lock, without
            // suspending, so concurrent callers can't both start a fetch
            let mut in_flight = self.in_flight.lock().expect("Locking failed");

            let existing = in_flight.get_mut(&key).and_then(|entry| {
                let fetch = entry.fetch.downcast_ref::<SharedFetch<T, E>>()?.clone();
                entry.subscribers += 1;
                Some((fetch, entry.id, entry.subscribers))
            });

            match existing {
                Some((fetch, id, subscribers)) => {
                    trace!(target: LOG_TARGET, %key, subscribers, "Joining in-flight fetch");
                    Ok((fetch, id))
                }
                None if in_flight.contains_key(&key) => {
                    // Same key, different result type: can't share, run alone
                    trace!(target: LOG_TARGET, %key, "In-flight fetch of another type, not sharing");
                    Err(fetcher)
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let fetch = Self::spawn_fetch(self.in_flight.clone(), key.clone(), id, fetcher);
                    in_flight.insert(
                        key.clone(),
                        InFlight {
                            id,
                            subscribers: 1,
                            fetch: Box::new(fetch.clone()),
                        },
                    );
                    trace!(target: LOG_TARGET, %key, "Starting new fetch");
                    Ok((fetch, id))
                }
            }
        };

        match fetch {
            Ok((fetch, id)) => {
                let _subscription = Subscription {
                    in_flight: self.in_flight.clone(),
                    key,
                    id,
                };
                fetch.await
            }
            Err(fetcher) => fetcher().await,
        }
    }

    /// Run the fetch on its own task, so it settles and unregisters even if
    /// every waiter goes away
    fn spawn_fetch<T, E, F, Fut>(
        in_flight: InFlightMap,
        key: RequestKey,
        id: u64,
        fetcher: F,
    ) -> SharedFetch<T, E>
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let registration = Registration { in_flight, key, id };
            let res = fetcher().await;
            trace!(
                target: LOG_TARGET,
                key = %registration.key,
                ok = res.is_ok(),
                "Fetch settled"
            );
            drop(registration);
            res
        });

        async move {
            match task.await {
                Ok(res) => res,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                // Runtime shutting down
                Err(_) => std::future::pending().await,
            }
        }
        .boxed()
        .shared()
    }

    /// Number of keys with a fetch in flight
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.lock().expect("Locking failed").len()
    }

    /// Callers attached to the in-flight fetch for `key`, if any
    pub fn subscribers(&self, key: &RequestKey) -> Option<usize> {
        self.in_flight
            .lock()
            .expect("Locking failed")
            .get(key)
            .map(|entry| entry.subscribers)
    }
}

#[cfg(test)]
mod tests;
