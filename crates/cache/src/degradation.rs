use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use nodeweave_core::key::RequestKey;
use nodeweave_rpc::RpcError;
use nodeweave_util_error::fmt::FmtCompact as _;
use serde::Serialize;
use snafu::IntoError as _;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::DegradationSnafu;
use crate::{
    CacheConfig, DegradationError, DegradationReason, FetchOptions, LOG_TARGET, TieredCache,
};

/// Result of [`DegradationManager::get_or_fetch`]
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<V> {
    pub value: V,
    /// Served from cache rather than freshly fetched
    pub cached: bool,
    /// Served from cache past its ttl, because the fetch failed
    pub stale: bool,
    /// Age of the value, when `stale`
    pub stale_age: Option<Duration>,
}

/// Map a failed fetch to the reason reported to callers
pub fn classify(err: &RpcError) -> DegradationReason {
    match err {
        RpcError::CircuitOpen { .. } => DegradationReason::CircuitOpen,
        RpcError::AllNodesFailed { last_error, .. } => {
            if last_error.is_rate_limited() {
                DegradationReason::RateLimited
            } else if last_error.is_timeout() {
                DegradationReason::Timeout
            } else if last_error.is_transport() {
                DegradationReason::NetworkError
            } else {
                DegradationReason::AllNodesFailed
            }
        }
    }
}

#[derive(Debug, Clone)]
struct DegradedOperationRecord {
    key: RequestKey,
    reason: DegradationReason,
    stale_age: Duration,
    at: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradedOperation {
    pub key: String,
    pub reason: DegradationReason,
    pub stale_age_ms: u64,
    pub secs_ago: u64,
}

/// Degradation over the trailing status window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegradationStatus {
    pub is_degraded: bool,
    pub degraded_operations: usize,
    pub average_stale_age_ms: Option<u64>,
    pub recent: Vec<DegradedOperation>,
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// The last line of defense of reads
///
/// Callers get either a value (possibly flagged as stale), or a single
/// classified [`DegradationError`].
pub struct DegradationManager {
    cache: TieredCache,
    config: CacheConfig,
    history: Mutex<VecDeque<DegradedOperationRecord>>,
}

impl DegradationManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: TieredCache::new(config.capacity),
            config,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn cache(&self) -> &TieredCache {
        &self.cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Answer from a fresh cache entry, or fetch, or fall back to a stale one
    pub async fn get_or_fetch<V, F, Fut>(
        &self,
        key: RequestKey,
        fetcher: F,
        options: &FetchOptions,
    ) -> Result<Fetched<V>, DegradationError>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RpcError>>,
    {
        let ttl = options.ttl.unwrap_or(self.config.default_ttl);
        let max_stale_age = options
            .max_stale_age
            .unwrap_or(self.config.default_max_stale_age);

        if let Some(hit) = self.cache.get::<V>(&key) {
            if hit.fresh {
                trace!(target: LOG_TARGET, %key, age_ms = duration_ms(hit.age), "Fresh cache hit");
                return Ok(Fetched {
                    value: hit.value,
                    cached: true,
                    stale: false,
                    stale_age: None,
                });
            }
        }

        let err = match fetcher().await {
            Ok(value) => {
                self.cache.insert(
                    key.clone(),
                    value.clone(),
                    ttl,
                    max_stale_age,
                    options.tags.iter().cloned(),
                );
                self.clear_history(&key);
                return Ok(Fetched {
                    value,
                    cached: false,
                    stale: false,
                    stale_age: None,
                });
            }
            Err(err) => err,
        };

        let reason = classify(&err);
        // Looked up again: the entry may have aged out while fetching
        let stale = self
            .cache
            .get::<V>(&key)
            .filter(|hit| hit.age <= max_stale_age);

        match stale {
            Some(hit) if hit.fresh => {
                // Stored by a concurrent read while this fetch was failing
                debug!(
                    target: LOG_TARGET,
                    %key,
                    %reason,
                    err = %err.fmt_compact(),
                    "Fetch failed, but a fresh entry appeared meanwhile"
                );
                Ok(Fetched {
                    value: hit.value,
                    cached: true,
                    stale: false,
                    stale_age: None,
                })
            }
            Some(hit) if options.stale_policy.allows(reason) => {
                debug!(
                    target: LOG_TARGET,
                    %key,
                    %reason,
                    stale_age_ms = duration_ms(hit.age),
                    err = %err.fmt_compact(),
                    "Serving stale data"
                );
                self.record(key, reason, hit.age);
                Ok(Fetched {
                    value: hit.value,
                    cached: true,
                    stale: true,
                    stale_age: Some(hit.age),
                })
            }
            Some(_) => {
                debug!(
                    target: LOG_TARGET,
                    %key,
                    %reason,
                    "Stale data available, but not allowed for this reason"
                );
                Err(DegradationSnafu { reason }.into_error(err))
            }
            None => {
                debug!(
                    target: LOG_TARGET,
                    %key,
                    %reason,
                    err = %err.fmt_compact(),
                    "Read failed with no usable cached data"
                );
                Err(DegradationSnafu { reason }.into_error(err))
            }
        }
    }

    fn record(&self, key: RequestKey, reason: DegradationReason, stale_age: Duration) {
        let mut history = self.history.lock().expect("Locking failed");
        history.push_back(DegradedOperationRecord {
            key,
            reason,
            stale_age,
            at: Instant::now(),
        });
        while self.config.history_len < history.len() {
            history.pop_front();
        }
    }

    fn clear_history(&self, key: &RequestKey) {
        self.history
            .lock()
            .expect("Locking failed")
            .retain(|record| &record.key != key);
    }

    pub fn degradation_status(&self) -> DegradationStatus {
        let now = Instant::now();
        let history = self.history.lock().expect("Locking failed");

        let recent: Vec<&DegradedOperationRecord> = history
            .iter()
            .filter(|record| now.saturating_duration_since(record.at) <= self.config.status_window)
            .collect();

        let average_stale_age_ms = u32::try_from(recent.len())
            .ok()
            .filter(|n| *n != 0)
            .map(|n| duration_ms(recent.iter().map(|r| r.stale_age).sum::<Duration>() / n));

        DegradationStatus {
            is_degraded: !recent.is_empty(),
            degraded_operations: recent.len(),
            average_stale_age_ms,
            recent: recent
                .into_iter()
                .map(|r| DegradedOperation {
                    key: r.key.to_string(),
                    reason: r.reason,
                    stale_age_ms: duration_ms(r.stale_age),
                    secs_ago: now.saturating_duration_since(r.at).as_secs(),
                })
                .collect(),
        }
    }
}
