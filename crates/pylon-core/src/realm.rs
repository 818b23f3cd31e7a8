//! The realm: Pylon's application container.
//!
//! A [`Realm`] is the single, explicitly-passed home for everything the
//! framework needs at runtime: registered values and factories, the
//! [`Environment`](crate::env::Environment), the cache, the event registry,
//! and the configured envelope codes. There is no global state; components
//! that need the realm receive an `Arc<Realm>`.
//!
//! Entries are string-keyed and dynamically typed. Three registration shapes
//! exist:
//!
//! - **instances** ([`Realm::set`]) are stored as-is and shared,
//! - **factories** ([`Realm::set_factory`]) run on every resolution,
//! - **singletons** ([`Realm::set_singleton`]) run once and cache the result.
//!
//! Factories receive the realm and may resolve other entries; the container
//! never holds its lock while a factory runs, so re-entrant resolution is
//! safe.

use crate::cache::{CacheStore, MemoryCache};
use crate::env::Environment;
use crate::error::{PylonError, PylonResult, ResponseCodes};
use crate::events::Events;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Well-known realm keys used by the framework.
pub mod tags {
    /// The middleware chain.
    pub const MIDDLEWARES: &str = "app.middlewares";
    /// The authentication chain.
    pub const AUTHENTICATIONS: &str = "app.authentications";
    /// The registered switches, keyed by version.
    pub const SWITCHES: &str = "app.switches";
    /// The event registry.
    pub const EVENTS: &str = "app.events";
}

type AnyArc = Arc<dyn Any + Send + Sync>;
type Factory = Arc<dyn Fn(&Realm) -> AnyArc + Send + Sync>;

#[derive(Clone)]
enum Entry {
    Instance(AnyArc),
    Factory(Factory),
    Singleton {
        factory: Factory,
        cell: Arc<OnceLock<AnyArc>>,
    },
}

/// The application container. See the [module docs](self) for an overview.
pub struct Realm {
    entries: RwLock<HashMap<String, Entry>>,
    environment: Arc<Environment>,
    cache: Arc<dyn CacheStore>,
    events: Arc<Events>,
    codes: ResponseCodes,
}

impl Realm {
    /// Creates a realm with default environment, cache, and events.
    #[must_use]
    pub fn new() -> Self {
        RealmBuilder::new().build_inner()
    }

    /// Starts building a realm.
    #[must_use]
    pub fn builder() -> RealmBuilder {
        RealmBuilder::new()
    }

    /// The environment settings.
    #[must_use]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// The cache store.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// The event registry.
    #[must_use]
    pub fn events(&self) -> &Arc<Events> {
        &self.events
    }

    /// The envelope codes loaded from the environment at build time.
    #[must_use]
    pub fn codes(&self) -> &ResponseCodes {
        &self.codes
    }

    /// Whether the application runs in debug mode.
    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.environment.is_debug()
    }

    /// The configured application name.
    #[must_use]
    pub fn app_name(&self) -> String {
        self.environment.app_name()
    }

    /// Registers an instance under `key`, replacing any previous entry.
    pub fn set<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T) {
        self.set_arc(key, Arc::new(value));
    }

    /// Registers an already-shared instance under `key`.
    pub fn set_arc<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: Arc<T>) {
        self.entries
            .write()
            .insert(key.into(), Entry::Instance(value));
    }

    /// Registers a factory that runs on every resolution of `key`.
    pub fn set_factory<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Realm) -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |realm| Arc::new(factory(realm)) as AnyArc);
        self.entries
            .write()
            .insert(key.into(), Entry::Factory(factory));
    }

    /// Registers a factory that runs at most once; the result is shared by
    /// all subsequent resolutions of `key`.
    pub fn set_singleton<T, F>(&self, key: impl Into<String>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Realm) -> T + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |realm| Arc::new(factory(realm)) as AnyArc);
        self.entries.write().insert(
            key.into(),
            Entry::Singleton {
                factory,
                cell: Arc::new(OnceLock::new()),
            },
        );
    }

    /// Returns true if `key` is registered.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Resolves `key` as a `T`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the key is unregistered, `Resolution` when the entry
    /// holds a different type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> PylonResult<Arc<T>> {
        let entry = self
            .entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PylonError::not_found(format!("Key {key} is not registered")))?;
        let resolved = self.resolve_entry(&entry);
        resolved.downcast::<T>().map_err(|_| {
            PylonError::resolution(format!(
                "Key {key} holds a different type than {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Resolves `key` as a `T`, returning `None` on absence or type mismatch.
    #[must_use]
    pub fn get_silently<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        self.get(key).ok()
    }

    /// Resolves `key` as a `T`, falling back to `default`.
    #[must_use]
    pub fn get_or_default<T: Send + Sync + 'static>(&self, key: &str, default: T) -> Arc<T> {
        self.get_silently(key)
            .unwrap_or_else(|| Arc::new(default))
    }

    /// Resolves `key` bypassing any singleton cache: factories and singleton
    /// factories run fresh, instances are returned as-is.
    pub fn make<T: Send + Sync + 'static>(&self, key: &str) -> PylonResult<Arc<T>> {
        let entry = self
            .entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| PylonError::not_found(format!("Key {key} is not registered")))?;
        let resolved = match entry {
            Entry::Instance(value) => value,
            Entry::Factory(factory) | Entry::Singleton { factory, .. } => factory(self),
        };
        resolved.downcast::<T>().map_err(|_| {
            PylonError::resolution(format!(
                "Key {key} holds a different type than {}",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Appends items to the `Vec<Arc<T>>` stored under `key`, creating the
    /// list when absent.
    ///
    /// # Errors
    ///
    /// `Resolution` when `key` exists but does not hold such a list.
    pub fn merge_list<T: Send + Sync + 'static>(
        &self,
        key: &str,
        items: Vec<Arc<T>>,
    ) -> PylonResult<()> {
        let mut entries = self.entries.write();
        let merged = match entries.get(key) {
            Some(Entry::Instance(existing)) => {
                let existing = existing.clone().downcast::<Vec<Arc<T>>>().map_err(|_| {
                    PylonError::resolution(format!(
                        "Key {key} does not hold a list of {}",
                        std::any::type_name::<T>()
                    ))
                })?;
                let mut list = existing.as_ref().clone();
                list.extend(items);
                list
            }
            Some(_) => {
                return Err(PylonError::resolution(format!(
                    "Key {key} does not hold a mergeable list"
                )))
            }
            None => items,
        };
        entries.insert(key.to_string(), Entry::Instance(Arc::new(merged)));
        Ok(())
    }

    /// Looks up a configuration value by key.
    ///
    /// Lookup order: cache store, then environment, then a `String` entry
    /// registered under the key.
    #[must_use]
    pub fn env(&self, key: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(key, false) {
            return match cached {
                serde_json::Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
        }
        if let Some(value) = self.environment.get(key) {
            return Some(value);
        }
        self.get_silently::<String>(key).map(|s| s.as_ref().clone())
    }

    /// Looks up a configuration value, falling back to `default`.
    #[must_use]
    pub fn env_or(&self, key: &str, default: &str) -> String {
        self.env(key).unwrap_or_else(|| default.to_string())
    }

    // Resolves an entry outside the map lock so factories can re-enter.
    fn resolve_entry(&self, entry: &Entry) -> AnyArc {
        match entry {
            Entry::Instance(value) => value.clone(),
            Entry::Factory(factory) => factory(self),
            Entry::Singleton { factory, cell } => cell.get_or_init(|| factory(self)).clone(),
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Realm")
            .field("entries", &self.entries.read().len())
            .field("debug", &self.is_debug())
            .finish()
    }
}

/// Builder for [`Realm`].
#[derive(Default)]
pub struct RealmBuilder {
    environment: Option<Arc<Environment>>,
    cache: Option<Arc<dyn CacheStore>>,
    events: Option<Arc<Events>>,
}

impl RealmBuilder {
    /// Creates a builder with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given environment instead of a fresh one.
    #[must_use]
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Uses the given cache store instead of an in-process [`MemoryCache`].
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Uses the given event registry.
    #[must_use]
    pub fn events(mut self, events: Arc<Events>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the realm.
    #[must_use]
    pub fn build(self) -> Arc<Realm> {
        Arc::new(self.build_inner())
    }

    fn build_inner(self) -> Realm {
        let environment = self.environment.unwrap_or_else(|| Arc::new(Environment::new()));
        let codes = ResponseCodes::from_env(&environment);
        let cache = self.cache.unwrap_or_else(|| {
            Arc::new(MemoryCache::with_prefix(
                environment.app_name().to_ascii_lowercase(),
            ))
        });
        Realm {
            entries: RwLock::new(HashMap::new()),
            environment,
            cache,
            events: self.events.unwrap_or_else(|| Arc::new(Events::new())),
            codes,
        }
    }
}
