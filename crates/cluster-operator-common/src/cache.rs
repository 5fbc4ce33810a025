//! Scoped in-memory cache
//!
//! Reconciliations running concurrently for different clusters share one
//! cache instance. A miss behaves exactly like running without a cache, so
//! [`NoopCache`] can be swapped in to disable caching without changing any
//! reconciliation result.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Key/value cache shared across reconciliations
pub trait Cache<V>: Send + Sync {
    /// Look up a value; `None` on miss or expiry
    fn get(&self, key: &str) -> Option<V>;

    /// Store a value
    fn put(&self, key: &str, value: V);
}

/// Cache that never stores anything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCache;

impl<V> Cache<V> for NoopCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn put(&self, _key: &str, _value: V) {}
}

/// Cache whose entries expire a fixed time after insertion
pub struct TtlCache<V> {
    ttl: Duration,
    entries: DashMap<String, (Instant, V)>,
}

impl<V> TtlCache<V> {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included until touched
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone + Send + Sync> Cache<V> for TtlCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        {
            let entry = self.entries.get(key)?;
            let (inserted, value) = entry.value();
            if inserted.elapsed() < self.ttl {
                return Some(value.clone());
            }
        }
        let ttl = self.ttl;
        self.entries
            .remove_if(key, |_, (inserted, _)| inserted.elapsed() >= ttl);
        None
    }

    fn put(&self, key: &str, value: V) {
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }
}
