use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use nodeweave_core::key::RequestKey;
use tokio::time::Instant;
use tracing::trace;

use crate::LOG_TARGET;

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    stored_at: Instant,
    ttl: Duration,
    max_stale_age: Duration,
    tags: BTreeSet<String>,
    /// Logical clock of the last read or write, for LRU eviction
    last_access: u64,
}

impl CacheEntry {
    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    fn is_dead(&self, now: Instant) -> bool {
        self.max_stale_age.max(self.ttl) < self.age(now)
    }
}

/// A cache hit, fresh or stale
#[derive(Debug, Clone, PartialEq)]
pub struct CachedValue<V> {
    pub value: V,
    pub age: Duration,
    /// `age < ttl`
    pub fresh: bool,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<RequestKey, CacheEntry>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// In-memory, capacity-bound store of recent read results
///
/// Values of any type can be stored; a lookup with a different type than
/// stored is a miss. Entries are dropped once older than their max stale age,
/// or, when over capacity, least recently used first.
pub struct TieredCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl TieredCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Look up `key`, fresh or within its max stale age
    pub fn get<V>(&self, key: &RequestKey) -> Option<CachedValue<V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("Locking failed");
        let tick = inner.tick();

        let entry = inner.entries.get_mut(key)?;
        if entry.is_dead(now) {
            inner.entries.remove(key);
            trace!(target: LOG_TARGET, %key, "Dropped entry past max stale age");
            return None;
        }
        entry.last_access = tick;

        let value = entry.value.downcast_ref::<V>()?.clone();
        let age = entry.age(now);
        Some(CachedValue {
            value,
            age,
            fresh: age < entry.ttl,
        })
    }

    pub fn insert<V>(
        &self,
        key: RequestKey,
        value: V,
        ttl: Duration,
        max_stale_age: Duration,
        tags: impl IntoIterator<Item = String>,
    ) where
        V: Send + Sync + 'static,
    {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("Locking failed");
        let tick = inner.tick();

        inner.entries.insert(
            key,
            CacheEntry {
                value: Arc::new(value),
                stored_at: now,
                ttl,
                max_stale_age,
                tags: tags.into_iter().collect(),
                last_access: tick,
            },
        );

        if self.capacity < inner.entries.len() {
            Self::evict(&mut inner, self.capacity, now);
        }
    }

    fn evict(inner: &mut Inner, capacity: usize, now: Instant) {
        inner.entries.retain(|_, entry| !entry.is_dead(now));
        let excess = inner.entries.len().saturating_sub(capacity);
        if excess == 0 {
            return;
        }

        let mut by_access: Vec<(u64, RequestKey)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        by_access.sort_unstable_by_key(|(last_access, _)| *last_access);

        for (_, key) in by_access.into_iter().take(excess) {
            trace!(target: LOG_TARGET, %key, "Evicting least recently used entry");
            inner.entries.remove(&key);
        }
    }

    pub fn invalidate(&self, key: &RequestKey) -> bool {
        self.inner
            .lock()
            .expect("Locking failed")
            .entries
            .remove(key)
            .is_some()
    }

    /// Drop every entry tagged with `tag`, returning how many were dropped
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock().expect("Locking failed");
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.tags.contains(tag));
        before - inner.entries.len()
    }

    pub fn clear(&self) {
        self.inner.lock().expect("Locking failed").entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("Locking failed").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests;
