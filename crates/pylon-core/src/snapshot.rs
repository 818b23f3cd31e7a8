//! Warm-boot snapshots of resolved settings.
//!
//! Resolving settings at boot can be expensive when env files live on slow
//! storage or values come from providers. A [`RegistrySnapshot`] captures the
//! resolved values once and persists them through the [`CacheStore`] boundary,
//! so a warm boot applies the snapshot instead of re-resolving.

use crate::cache::CacheStore;
use crate::env::Environment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Cache key snapshots are stored under.
pub const SNAPSHOT_KEY: &str = "pylon.realm.snapshot";

/// A point-in-time capture of resolved environment settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    settings: BTreeMap<String, String>,
}

impl RegistrySnapshot {
    /// Captures the current values of the given keys. Unset keys are skipped.
    #[must_use]
    pub fn capture(env: &Environment, keys: &[&str]) -> Self {
        let settings = keys
            .iter()
            .filter_map(|key| env.get(key).map(|value| ((*key).to_string(), value)))
            .collect();
        Self { settings }
    }

    /// Number of captured settings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Writes the captured settings back into an environment as overrides.
    pub fn apply(&self, env: &Environment) {
        for (key, value) in &self.settings {
            env.set(key.clone(), value.clone());
        }
    }

    /// Persists the snapshot into the cache store, under the store's
    /// application prefix.
    pub fn persist(&self, cache: &dyn CacheStore, ttl: Option<Duration>) {
        if let Ok(value) = serde_json::to_value(self) {
            cache.set(SNAPSHOT_KEY, value, ttl, false);
        }
    }

    /// Restores a previously persisted snapshot, if one is present and still
    /// parseable.
    #[must_use]
    pub fn restore(cache: &dyn CacheStore) -> Option<Self> {
        let value = cache.get(SNAPSHOT_KEY, false)?;
        serde_json::from_value(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_capture_skips_unset() {
        let env = Environment::new();
        env.set("SNAP_A", "1");
        let snapshot = RegistrySnapshot::capture(&env, &["SNAP_A", "SNAP_UNSET"]);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_persist_restore_apply() {
        let env = Environment::new();
        env.set("SNAP_NAME", "pylon");
        env.set("SNAP_PORT", "8080");
        let snapshot = RegistrySnapshot::capture(&env, &["SNAP_NAME", "SNAP_PORT"]);

        let cache = MemoryCache::new();
        snapshot.persist(&cache, None);
        let restored = RegistrySnapshot::restore(&cache).unwrap();
        assert_eq!(restored, snapshot);

        let fresh = Environment::new();
        restored.apply(&fresh);
        assert_eq!(fresh.get("SNAP_NAME").as_deref(), Some("pylon"));
        assert_eq!(fresh.get("SNAP_PORT").as_deref(), Some("8080"));
    }

    #[test]
    fn test_restore_absent() {
        let cache = MemoryCache::new();
        assert!(RegistrySnapshot::restore(&cache).is_none());
    }
}
