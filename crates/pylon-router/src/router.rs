//! Switch registration and route resolution.

use crate::method_map::{Endpoint, MethodMap, RouteTarget};
use crate::switch::{ServiceRegistry, Switch};
use crate::table::{RouteMatch, RouteTable};
use http::Method;
use parking_lot::RwLock;
use pylon_core::{PylonError, PylonResult, Scheme};
use std::sync::Arc;

/// Registration options for a switch.
#[derive(Debug, Clone)]
pub struct SwitchOptions {
    /// Schemes the version's routes answer on.
    pub schemes: Vec<Scheme>,
    /// Methods to expose. POST enables body dispatch at the version root;
    /// GET enables path dispatch at `{service}/{action}/`.
    pub methods: Vec<Method>,
}

impl Default for SwitchOptions {
    fn default() -> Self {
        Self {
            schemes: vec![Scheme::Https, Scheme::Http],
            methods: vec![Method::POST, Method::GET],
        }
    }
}

/// Registers switches and resolves incoming requests to endpoints.
///
/// All routes live under a single API base (default `/api/`). Each
/// registered version contributes a POST dispatch root, an optional GET
/// dispatch path, and a ping route.
pub struct Router {
    base: RwLock<String>,
    table: RwLock<RouteTable>,
    registry: ServiceRegistry,
}

impl Router {
    /// Creates a router mounted at `/api/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: RwLock::new("/api/".to_string()),
            table: RwLock::new(RouteTable::new()),
            registry: ServiceRegistry::new(),
        }
    }

    /// Changes the API base for subsequently registered switches. The path
    /// is normalized to carry exactly one leading and one trailing slash.
    pub fn base(&self, path: &str) {
        let trimmed = path.trim().trim_matches('/');
        let normalized = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{trimmed}/")
        };
        *self.base.write() = normalized;
    }

    /// The current API base.
    #[must_use]
    pub fn api_base(&self) -> String {
        self.base.read().clone()
    }

    /// The service registry the dispatcher resolves against.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Normalizes a version string into a route segment: trimmed,
    /// lowercased, with everything outside `[a-z0-9_]` dropped. The result
    /// is deterministic and idempotent, so `"V1"` and `"v1 "` register the
    /// same version.
    #[must_use]
    pub fn clean_version(raw: &str) -> String {
        raw.trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect()
    }

    /// Registers a switch under a version with default options.
    ///
    /// # Errors
    ///
    /// See [`Router::switch_with`].
    pub fn switch(&self, switch: &dyn Switch, version: &str) -> PylonResult<()> {
        self.switch_with(switch, version, &SwitchOptions::default())
    }

    /// Registers a switch under a version.
    ///
    /// Routes created (under the current base, with `v` the cleaned
    /// version): POST `{base}{v}/` and GET `{base}{v}/{service}/{action}/`
    /// to the dispatch processor, GET `{base}{v}/ping` to the ping
    /// endpoint. The switch's services land in the registry keyed by `v`.
    ///
    /// # Errors
    ///
    /// `Configuration` when the cleaned version is empty or already
    /// registered.
    pub fn switch_with(
        &self,
        switch: &dyn Switch,
        version: &str,
        options: &SwitchOptions,
    ) -> PylonResult<()> {
        let cleaned = Self::clean_version(version);
        if cleaned.is_empty() {
            return Err(PylonError::configuration(format!(
                "Version {version:?} normalizes to an empty segment"
            )));
        }
        if self.registry.has_version(&cleaned) {
            return Err(PylonError::configuration(format!(
                "Version {cleaned} is already registered"
            )));
        }

        let base = self.api_base();
        let processor = Endpoint::Processor {
            version: cleaned.clone(),
        };

        let mut root = MethodMap::new();
        if options.methods.contains(&Method::POST) {
            root = root.post(RouteTarget::new(processor.clone(), options.schemes.clone()));
        }
        let mut table = self.table.write();
        table.insert(&format!("{base}{cleaned}/"), root);

        if options.methods.contains(&Method::GET) {
            table.insert(
                &format!("{base}{cleaned}/{{service}}/{{action}}/"),
                MethodMap::new().get(RouteTarget::new(processor, options.schemes.clone())),
            );
        }

        table.insert(
            &format!("{base}{cleaned}/ping"),
            MethodMap::new().get(RouteTarget::new(
                Endpoint::Ping {
                    version: cleaned.clone(),
                },
                options.schemes.clone(),
            )),
        );
        drop(table);

        for service in switch.services() {
            tracing::debug!(
                version = cleaned,
                service = service.name(),
                "registering service"
            );
            self.registry.register(&cleaned, service);
        }

        Ok(())
    }

    /// Registers several switches at ascending versions (`v1`, `v2`, ...).
    ///
    /// # Errors
    ///
    /// The first registration failure.
    pub fn switches(&self, switches: &[(&dyn Switch, &str)]) -> PylonResult<()> {
        for (switch, version) in switches {
            self.switch(*switch, version)?;
        }
        Ok(())
    }

    /// Resolves a request to an endpoint.
    #[must_use]
    pub fn resolve(&self, method: &Method, path: &str, scheme: Scheme) -> Option<RouteMatch> {
        self.table.read().match_route(method, path, scheme)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("base", &self.api_base())
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::switch::Service;
    use pylon_core::{BaseResponse, Realm, Request};
    use serde_json::json;
    use std::sync::Arc;

    struct PingPong;

    impl Service for PingPong {
        fn name(&self) -> &str {
            "pingpong"
        }

        fn process_action(
            &self,
            _action: &str,
            _request: &Request,
            _realm: &Realm,
        ) -> PylonResult<BaseResponse> {
            Ok(BaseResponse::ok(json!("pong")))
        }
    }

    struct SingleSwitch;

    impl Switch for SingleSwitch {
        fn services(&self) -> Vec<Arc<dyn Service>> {
            vec![Arc::new(PingPong)]
        }
    }

    proptest::proptest! {
        #[test]
        fn prop_clean_version_idempotent(raw in "\\PC{0,24}") {
            let once = Router::clean_version(&raw);
            let twice = Router::clean_version(&once);
            proptest::prop_assert_eq!(&once, &twice);
            proptest::prop_assert!(once
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }

    #[test]
    fn test_clean_version() {
        assert_eq!(Router::clean_version("V1"), "v1");
        assert_eq!(Router::clean_version(" v1 "), "v1");
        assert_eq!(Router::clean_version("v2-beta!"), "v2beta");
        assert_eq!(Router::clean_version("release_3"), "release_3");
        // Idempotent on its own output.
        assert_eq!(Router::clean_version(&Router::clean_version("V1 ")), "v1");
    }

    #[test]
    fn test_switch_registers_routes() {
        let router = Router::new();
        router.switch(&SingleSwitch, "V1").unwrap();

        assert!(router
            .resolve(&Method::POST, "/api/v1/", Scheme::Https)
            .is_some());
        let matched = router
            .resolve(&Method::GET, "/api/v1/pingpong/run/", Scheme::Https)
            .unwrap();
        assert_eq!(matched.params.get("service"), Some("pingpong"));
        assert_eq!(matched.params.get("action"), Some("run"));
        let ping = router
            .resolve(&Method::GET, "/api/v1/ping", Scheme::Http)
            .unwrap();
        assert!(matches!(ping.endpoint, Endpoint::Ping { .. }));

        assert!(router.registry().resolve("v1", "pingpong").is_some());
    }

    #[test]
    fn test_duplicate_version_fails() {
        let router = Router::new();
        router.switch(&SingleSwitch, "v1").unwrap();
        let err = router.switch(&SingleSwitch, "V1 ").unwrap_err();
        assert_eq!(err.category(), pylon_core::ErrorCategory::Configuration);
    }

    #[test]
    fn test_empty_version_fails() {
        let router = Router::new();
        let err = router.switch(&SingleSwitch, "!!!").unwrap_err();
        assert_eq!(err.category(), pylon_core::ErrorCategory::Configuration);
    }

    #[test]
    fn test_custom_base() {
        let router = Router::new();
        router.base("backend");
        assert_eq!(router.api_base(), "/backend/");
        router.switch(&SingleSwitch, "v1").unwrap();
        assert!(router
            .resolve(&Method::POST, "/backend/v1/", Scheme::Https)
            .is_some());
        assert!(router
            .resolve(&Method::POST, "/api/v1/", Scheme::Https)
            .is_none());
    }

    #[test]
    fn test_post_only_switch() {
        let router = Router::new();
        let options = SwitchOptions {
            methods: vec![Method::POST],
            ..SwitchOptions::default()
        };
        router.switch_with(&SingleSwitch, "v1", &options).unwrap();
        assert!(router
            .resolve(&Method::POST, "/api/v1/", Scheme::Https)
            .is_some());
        assert!(router
            .resolve(&Method::GET, "/api/v1/pingpong/run/", Scheme::Https)
            .is_none());
        // Ping stays available regardless of dispatch methods.
        assert!(router
            .resolve(&Method::GET, "/api/v1/ping", Scheme::Https)
            .is_some());
    }
}
