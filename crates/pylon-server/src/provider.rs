//! Application assembly: providers and the app builder.

use crate::kernel::Kernel;
use pylon_auth::{AuthenticationBackend, AuthenticationChain};
use pylon_core::realm::tags;
use pylon_core::snapshot::RegistrySnapshot;
use pylon_core::{
    env::keys, CacheStore, Environment, Events, PylonError, PylonResult, Realm, RealmBuilder,
};
use pylon_middleware::{CorsMiddleware, Middleware, MiddlewareChain, RequestLogMiddleware};
use pylon_router::{Dispatcher, Router, Switch, SwitchOptions};
use std::collections::HashMap;
use std::sync::Arc;

type MiddlewareFactory = Box<dyn Fn() -> Arc<dyn Middleware> + Send + Sync>;
type BackendFactory = Box<dyn Fn() -> Arc<dyn AuthenticationBackend> + Send + Sync>;

/// A pluggable bundle of registrations.
///
/// Libraries and application modules implement `Provider` to contribute
/// middlewares, authentication backends, and realm entries without touching
/// the application's assembly code. Providers are collected by the
/// [`AppBuilder`] and applied in insertion order.
pub trait Provider: Send + Sync {
    /// Name used in boot logs.
    fn name(&self) -> &str;

    /// Middlewares to append to the chain. Default: none.
    fn middlewares(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }

    /// Authentication backends to append to the chain. Default: none.
    fn authentications(&self) -> Vec<Arc<dyn AuthenticationBackend>> {
        Vec::new()
    }

    /// Arbitrary realm registrations. Runs after the chains are assembled.
    ///
    /// # Errors
    ///
    /// Any error fails the boot.
    fn register(&self, _realm: &Realm) -> PylonResult<()> {
        Ok(())
    }
}

/// Assembles a [`Kernel`] from environment, chains, switches, and
/// providers.
///
/// # Example
///
/// ```rust,ignore
/// let kernel = AppBuilder::new()
///     .switch(Box::new(AppSwitch), "v1")
///     .provider(Arc::new(BillingModule))
///     .build()?;
/// ```
pub struct AppBuilder {
    environment: Option<Arc<Environment>>,
    cache: Option<Arc<dyn CacheStore>>,
    events: Arc<Events>,
    middlewares: Vec<Arc<dyn Middleware>>,
    backends: Vec<Arc<dyn AuthenticationBackend>>,
    middleware_factories: HashMap<String, MiddlewareFactory>,
    backend_factories: HashMap<String, BackendFactory>,
    providers: Vec<Arc<dyn Provider>>,
    switches: Vec<(Box<dyn Switch>, String, SwitchOptions)>,
    base: Option<String>,
    default_middlewares: bool,
    use_snapshot: bool,
}

impl AppBuilder {
    /// Starts an empty application.
    #[must_use]
    pub fn new() -> Self {
        Self {
            environment: None,
            cache: None,
            events: Arc::new(Events::new()),
            middlewares: Vec::new(),
            backends: Vec::new(),
            middleware_factories: HashMap::new(),
            backend_factories: HashMap::new(),
            providers: Vec::new(),
            switches: Vec::new(),
            base: None,
            default_middlewares: true,
            use_snapshot: false,
        }
    }

    /// Uses the given environment instead of one loaded from `.env`.
    #[must_use]
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Uses the given cache store.
    #[must_use]
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Registers an event listener before boot.
    #[must_use]
    pub fn on<F>(self, event: impl Into<String>, listener: F) -> Self
    where
        F: Fn(&str, &serde_json::Value) + Send + Sync + 'static,
    {
        self.events.on(event, listener);
        self
    }

    /// Appends a middleware after the built-in ones.
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Appends an authentication backend.
    #[must_use]
    pub fn authentication(mut self, backend: Arc<dyn AuthenticationBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Makes a middleware constructible by name through the `MIDDLEWARES`
    /// environment list. Registration alone changes nothing; the middleware
    /// joins the chain only when the environment names it.
    #[must_use]
    pub fn middleware_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Middleware> + Send + Sync + 'static,
    {
        self.middleware_factories
            .insert(name.into(), Box::new(factory));
        self
    }

    /// Makes an authentication backend constructible by name through the
    /// `AUTHENTICATIONS` environment list.
    #[must_use]
    pub fn authentication_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn AuthenticationBackend> + Send + Sync + 'static,
    {
        self.backend_factories.insert(name.into(), Box::new(factory));
        self
    }

    /// Collects a provider. Providers apply in insertion order, after the
    /// directly-registered middlewares and backends.
    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Registers a switch at a version with default options.
    #[must_use]
    pub fn switch(mut self, switch: Box<dyn Switch>, version: impl Into<String>) -> Self {
        self.switches
            .push((switch, version.into(), SwitchOptions::default()));
        self
    }

    /// Registers a switch with explicit options.
    #[must_use]
    pub fn switch_with(
        mut self,
        switch: Box<dyn Switch>,
        version: impl Into<String>,
        options: SwitchOptions,
    ) -> Self {
        self.switches.push((switch, version.into(), options));
        self
    }

    /// Overrides the API base path.
    #[must_use]
    pub fn base(mut self, path: impl Into<String>) -> Self {
        self.base = Some(path.into());
        self
    }

    /// Skips the built-in request-log and CORS middlewares.
    #[must_use]
    pub fn without_default_middlewares(mut self) -> Self {
        self.default_middlewares = false;
        self
    }

    /// Restores resolved settings from a cached snapshot before boot and
    /// persists a fresh snapshot after.
    #[must_use]
    pub fn with_snapshot(mut self) -> Self {
        self.use_snapshot = true;
        self
    }

    /// Boots the application.
    ///
    /// # Errors
    ///
    /// `Configuration` for invalid registrations (duplicate versions,
    /// absent anchors, environment lists naming unregistered factories)
    /// and whatever provider registration raises.
    pub fn build(self) -> PylonResult<Kernel> {
        let environment = self
            .environment
            .unwrap_or_else(|| Arc::new(Environment::from_dotenv()));

        let mut realm_builder = RealmBuilder::new()
            .environment(Arc::clone(&environment))
            .events(Arc::clone(&self.events));
        if let Some(cache) = self.cache {
            if self.use_snapshot {
                if let Some(snapshot) = RegistrySnapshot::restore(cache.as_ref()) {
                    tracing::info!(settings = snapshot.len(), "restored settings snapshot");
                    snapshot.apply(&environment);
                }
            }
            realm_builder = realm_builder.cache(cache);
        }
        let realm = realm_builder.build();

        let middleware = Arc::new(MiddlewareChain::new(Arc::clone(&self.events)));
        if self.default_middlewares {
            middleware.add(Arc::new(RequestLogMiddleware::new(&environment)));
            middleware.add(Arc::new(CorsMiddleware::new()));
        }
        for name in configured_names(&environment, keys::MIDDLEWARES) {
            let factory = self.middleware_factories.get(&name).ok_or_else(|| {
                PylonError::configuration(format!(
                    "Middleware {name} is named in {} but has no registered factory",
                    keys::MIDDLEWARES
                ))
            })?;
            middleware.add(factory());
        }
        middleware.add_all(self.middlewares);

        let auth = Arc::new(AuthenticationChain::new(Arc::clone(&self.events)));
        for name in configured_names(&environment, keys::AUTHENTICATIONS) {
            let factory = self.backend_factories.get(&name).ok_or_else(|| {
                PylonError::configuration(format!(
                    "Authentication backend {name} is named in {} but has no registered factory",
                    keys::AUTHENTICATIONS
                ))
            })?;
            auth.add_backend(factory());
        }
        auth.add_all(self.backends);

        for provider in &self.providers {
            tracing::debug!(provider = provider.name(), "booting provider");
            middleware.add_all(provider.middlewares());
            auth.add_all(provider.authentications());
        }

        let router = Arc::new(Router::new());
        router.base(&environment.api_base());
        if let Some(base) = &self.base {
            router.base(base);
        }
        for (switch, version, options) in &self.switches {
            router.switch_with(switch.as_ref(), version, options)?;
        }

        realm.set_arc(tags::MIDDLEWARES, Arc::clone(&middleware));
        realm.set_arc(tags::AUTHENTICATIONS, Arc::clone(&auth));
        realm.set_arc(tags::SWITCHES, Arc::clone(&router));
        realm.set_arc(tags::EVENTS, Arc::clone(&self.events));

        for provider in &self.providers {
            provider.register(&realm)?;
        }

        if self.use_snapshot {
            let snapshot = RegistrySnapshot::capture(
                &environment,
                &[
                    keys::APP_NAME,
                    keys::DEBUG,
                    keys::API_BASE,
                    "NOT_FOUND_CODE",
                    "UNAUTHENTICATED_CODE",
                    "UNAUTHORIZED_CODE",
                    "SERVER_ERROR_CODE",
                ],
            );
            snapshot.persist(realm.cache().as_ref(), None);
        }

        tracing::info!(
            app = realm.app_name(),
            middlewares = ?middleware.all(),
            backends = ?auth.backends(),
            "application booted"
        );

        let dispatcher = Dispatcher::new(router, Arc::clone(&realm));
        Ok(Kernel::new(realm, middleware, auth, dispatcher))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Splits a comma-separated environment list into trimmed, non-empty names.
fn configured_names(environment: &Environment, key: &str) -> Vec<String> {
    environment
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_names_splitting() {
        let env = Environment::new();
        env.set("CHAIN_LIST", " request_log, cors ,,stamp ");
        assert_eq!(
            configured_names(&env, "CHAIN_LIST"),
            vec!["request_log", "cors", "stamp"]
        );
        assert!(configured_names(&env, "CHAIN_UNSET").is_empty());
    }
}
