//! Switches, services, and the service registry.
//!
//! A *service* is a named bundle of actions; a *switch* groups the services
//! exposed under one API version. Clients never address paths below the
//! version root: they name a `service` and an `action`, and the dispatcher
//! routes the pair through the registry.

use parking_lot::RwLock;
use pylon_core::{BaseResponse, PylonResult, Realm, Request};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named bundle of actions.
pub trait Service: Send + Sync {
    /// The name clients use to address this service.
    fn name(&self) -> &str;

    /// Runs one action against the request.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown actions; anything else the action raises.
    fn process_action(
        &self,
        action: &str,
        request: &Request,
        realm: &Realm,
    ) -> PylonResult<BaseResponse>;
}

/// The services exposed under one API version.
pub trait Switch: Send + Sync {
    /// The services this switch exposes. Called once at registration.
    fn services(&self) -> Vec<Arc<dyn Service>>;
}

enum ServiceEntry {
    Instance(Arc<dyn Service>),
    Factory(Box<dyn Fn() -> Arc<dyn Service> + Send + Sync>),
}

/// Versioned name-to-service lookup used by the dispatcher.
#[derive(Default)]
pub struct ServiceRegistry {
    // version -> service name -> entry
    entries: RwLock<HashMap<String, HashMap<String, ServiceEntry>>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared service instance under a version.
    pub fn register(&self, version: &str, service: Arc<dyn Service>) {
        let name = service.name().to_string();
        self.entries
            .write()
            .entry(version.to_string())
            .or_default()
            .insert(name, ServiceEntry::Instance(service));
    }

    /// Registers a factory that builds a fresh service per resolution.
    pub fn register_factory<F>(&self, version: &str, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Service> + Send + Sync + 'static,
    {
        self.entries
            .write()
            .entry(version.to_string())
            .or_default()
            .insert(name.into(), ServiceEntry::Factory(Box::new(factory)));
    }

    /// Resolves a service by version and name.
    #[must_use]
    pub fn resolve(&self, version: &str, name: &str) -> Option<Arc<dyn Service>> {
        let entries = self.entries.read();
        let entry = entries.get(version)?.get(name)?;
        Some(match entry {
            ServiceEntry::Instance(service) => Arc::clone(service),
            ServiceEntry::Factory(factory) => factory(),
        })
    }

    /// Returns true when the version has at least one service registered.
    #[must_use]
    pub fn has_version(&self, version: &str) -> bool {
        self.entries.read().contains_key(version)
    }

    /// Service names registered under a version, sorted.
    #[must_use]
    pub fn service_names(&self, version: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .read()
            .get(version)
            .map(|services| services.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.read();
        f.debug_struct("ServiceRegistry")
            .field("versions", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    struct EchoService;

    impl Service for EchoService {
        fn name(&self) -> &str {
            "echo"
        }

        fn process_action(
            &self,
            action: &str,
            _request: &Request,
            _realm: &Realm,
        ) -> PylonResult<BaseResponse> {
            Ok(BaseResponse::ok(json!({"action": action})))
        }
    }

    #[test]
    fn test_register_resolve() {
        let registry = ServiceRegistry::new();
        registry.register("v1", Arc::new(EchoService));
        let service = registry.resolve("v1", "echo").unwrap();
        let realm = Realm::new();
        let request = Request::new(Method::POST, "/api/v1/");
        let response = service.process_action("say", &request, &realm).unwrap();
        assert_eq!(response.return_data, Some(json!({"action": "say"})));
        assert!(registry.resolve("v1", "ghost").is_none());
        assert!(registry.resolve("v2", "echo").is_none());
    }

    #[test]
    fn test_factory_builds_fresh() {
        let registry = ServiceRegistry::new();
        registry.register_factory("v1", "echo", || Arc::new(EchoService) as Arc<dyn Service>);
        let first = registry.resolve("v1", "echo").unwrap();
        let second = registry.resolve("v1", "echo").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_service_names_sorted() {
        struct Named(&'static str);
        impl Service for Named {
            fn name(&self) -> &str {
                self.0
            }
            fn process_action(
                &self,
                _action: &str,
                _request: &Request,
                _realm: &Realm,
            ) -> PylonResult<BaseResponse> {
                Ok(BaseResponse::default())
            }
        }

        let registry = ServiceRegistry::new();
        registry.register("v1", Arc::new(Named("zeta")));
        registry.register("v1", Arc::new(Named("alpha")));
        assert_eq!(registry.service_names("v1"), vec!["alpha", "zeta"]);
        assert!(registry.has_version("v1"));
        assert!(!registry.has_version("v2"));
    }
}
