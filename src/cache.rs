//! Time-bounded cache of query results keyed by query key.
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    fetched_at: Instant,
    last_used: Instant,
}

/// Entries are fresh for `stale_after` since they were fetched and are
/// evicted `evict_after` since they were last used.
#[derive(Debug, Clone)]
pub struct QueryCache<V> {
    entries: HashMap<String, Entry<V>>,
    stale_after: Duration,
    evict_after: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Fresh(V),
    Stale,
    Miss,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(stale_after: Duration, evict_after: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            stale_after,
            evict_after,
        }
    }

    /// Store a value. `fetched_at` is when its latest chunk arrived.
    pub fn insert(&mut self, key: &str, value: V, fetched_at: Instant, now: Instant) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                fetched_at,
                last_used: now,
            },
        );
    }

    pub fn lookup(&mut self, key: &str, now: Instant) -> Lookup<V> {
        self.evict_expired(now);
        let Some(entry) = self.entries.get_mut(key) else {
            return Lookup::Miss;
        };
        if now.duration_since(entry.fetched_at) >= self.stale_after {
            debug!(key, "cached query is stale");
            self.entries.remove(key);
            return Lookup::Stale;
        }
        entry.last_used = now;
        Lookup::Fresh(entry.value.clone())
    }

    /// The instant the cached value was first fetched, if any.
    pub fn fetched_at(&self, key: &str) -> Option<Instant> {
        self.entries.get(key).map(|e| e.fetched_at)
    }

    pub fn evict_expired(&mut self, now: Instant) {
        let evict_after = self.evict_after;
        self.entries.retain(|key, e| {
            let keep = now.duration_since(e.last_used) < evict_after;
            if !keep {
                debug!(key = %key, "evicting cached query");
            }
            keep
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
