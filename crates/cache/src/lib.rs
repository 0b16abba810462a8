// SPDX-License-Identifier: MIT

//! Caching and graceful degradation of reads
//!
//! [`TieredCache`] keeps recent results in memory. [`DegradationManager`]
//! sits on top: it answers from fresh cache entries, fetches otherwise, and
//! when the fetch fails falls back to a stale entry (flagged as such)
//! instead of failing, as long as the entry is not too old.
mod config;
mod degradation;
mod error;
mod store;

pub use config::{CacheConfig, CacheTier, FetchOptions, StalePolicy};
pub use degradation::{
    DegradationManager, DegradationStatus, DegradedOperation, Fetched, classify,
};
pub use error::{DegradationError, DegradationReason};
pub use store::{CachedValue, TieredCache};

const LOG_TARGET: &str = "nodeweave::cache";
