//! Pluggable cache abstraction.
//!
//! The kernel uses a [`CacheStore`] both for short-circuiting repeated
//! service calls and as the fastest tier of environment lookups. The default
//! [`MemoryCache`] is an in-process map; applications swap in a shared store
//! by registering their own implementation in the realm.
//!
//! Keys come in two flavors. Non-exact keys (`exact == false`) are qualified
//! with the store's application prefix before hitting the backing map, so
//! several applications sharing one store cannot clobber each other's
//! fingerprints or settings. Exact keys bypass the prefix and address the
//! backing map directly.

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A key-value cache holding JSON values.
///
/// Implementations must be safe to share across worker tasks.
pub trait CacheStore: Send + Sync {
    /// Returns the cached value for `key`, if present and not expired.
    ///
    /// When `exact` is false the key is qualified with the store's
    /// application prefix first.
    fn get(&self, key: &str, exact: bool) -> Option<Value>;

    /// Stores `value` under `key`, with an optional time-to-live. The same
    /// `exact` qualification as [`CacheStore::get`] applies.
    fn set(&self, key: &str, value: Value, ttl: Option<Duration>, exact: bool);

    /// Returns true if `key` is present and not expired.
    ///
    /// `get(key, exact).is_some()` and `has(key, exact)` must agree at any
    /// single point in time.
    fn has(&self, key: &str, exact: bool) -> bool {
        self.get(key, exact).is_some()
    }

    /// Removes `key` from the cache.
    fn forget(&self, key: &str, exact: bool);
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process [`CacheStore`] backed by a `HashMap`.
///
/// Expired entries are dropped lazily on read.
pub struct MemoryCache {
    prefix: String,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache with the default `pylon` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix("pylon")
    }

    /// Creates an empty cache whose non-exact keys are qualified with
    /// `prefix`.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .values()
            .filter(|e| !e.is_expired())
            .count()
    }

    /// Returns true if the cache holds no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn qualify(&self, key: &str, exact: bool) -> String {
        if exact {
            key.to_string()
        } else {
            format!("{}:{}", self.prefix, key)
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str, exact: bool) -> Option<Value> {
        let key = self.qualify(key, exact);
        {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: upgrade to a write lock and evict.
        self.entries.write().remove(&key);
        None
    }

    fn set(&self, key: &str, value: Value, ttl: Option<Duration>, exact: bool) {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().insert(self.qualify(key, exact), entry);
    }

    fn forget(&self, key: &str, exact: bool) {
        self.entries.write().remove(&self.qualify(key, exact));
    }
}
