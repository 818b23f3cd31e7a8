//! # Pylon
//!
//! **A switch-dispatch JSON API framework**
//!
//! Pylon turns the usual REST surface inside out: instead of one route per
//! resource, clients address a `service` and an `action`, and every reply
//! is the same camelCase envelope over HTTP 200:
//!
//! ```json
//! {"returnCode": 0, "returnMessage": null, "returnData": {...}, "extraData": null}
//! ```
//!
//! The moving parts:
//!
//! - a **realm** — the explicitly-passed application container,
//! - a **middleware chain** running before and after dispatch,
//! - an **authentication chain** of backends tried in order,
//! - **switches** grouping services under an API version,
//! - a **kernel** tying the pipeline together, hosted over hyper.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use pylon::prelude::*;
//! use serde_json::json;
//!
//! struct Hello;
//!
//! impl Service for Hello {
//!     fn name(&self) -> &str {
//!         "hello"
//!     }
//!
//!     fn process_action(
//!         &self,
//!         action: &str,
//!         _request: &Request,
//!         _realm: &Realm,
//!     ) -> PylonResult<BaseResponse> {
//!         match action {
//!             "wave" => Ok(BaseResponse::ok(json!("👋"))),
//!             other => Err(PylonError::not_found(format!("Action {other} not found"))),
//!         }
//!     }
//! }
//!
//! struct AppSwitch;
//!
//! impl Switch for AppSwitch {
//!     fn services(&self) -> Vec<std::sync::Arc<dyn Service>> {
//!         vec![std::sync::Arc::new(Hello)]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> PylonResult<()> {
//!     let kernel = AppBuilder::new().switch(Box::new(AppSwitch), "v1").build()?;
//!     Server::new(kernel, ServerConfig::default()).run().await
//! }
//! ```
//!
//! A `POST /api/v1/` with `{"service": "hello", "action": "wave"}` and a
//! `GET /api/v1/hello/wave/` now dispatch identically.

pub use pylon_auth as auth;
pub use pylon_core as core;
pub use pylon_middleware as middleware;
pub use pylon_router as router;
pub use pylon_server as server;

/// Convenient imports for applications.
///
/// # Example
///
/// ```rust
/// use pylon::prelude::*;
/// ```
pub mod prelude {
    pub use pylon_auth::{AuthenticationBackend, AuthenticationChain};
    pub use pylon_core::{
        BaseResponse, CacheStore, Environment, Events, MemoryCache, PylonError, PylonResult,
        Realm, Request, Scheme, UserContext,
    };
    pub use pylon_middleware::{Middleware, MiddlewareChain, PhaseOutcome};
    pub use pylon_router::{
        cache_response, Dispatcher, Router, Service, Switch, SwitchOptions,
    };
    pub use pylon_server::{AppBuilder, Kernel, Provider, Server, ServerConfig, ShutdownSignal};
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoService;

    impl Service for EchoService {
        fn name(&self) -> &str {
            "echo"
        }

        fn process_action(
            &self,
            action: &str,
            request: &Request,
            _realm: &Realm,
        ) -> PylonResult<BaseResponse> {
            Ok(BaseResponse::ok(json!({
                "action": action,
                "payload": request.data().get("payload").cloned(),
            })))
        }
    }

    struct EchoSwitch;

    impl Switch for EchoSwitch {
        fn services(&self) -> Vec<Arc<dyn Service>> {
            vec![Arc::new(EchoService)]
        }
    }

    #[test]
    fn test_prelude_covers_an_application() {
        let kernel = AppBuilder::new()
            .environment(Arc::new(Environment::new()))
            .switch(Box::new(EchoSwitch), "v1")
            .build()
            .unwrap();

        let mut request = Request::new(http::Method::POST, "/api/v1/").with_data(json!({
            "service": "echo",
            "action": "repeat",
            "payload": {"n": 3},
        }));
        let response = kernel.handle(&mut request);
        assert_eq!(response.return_code, 0);
        assert_eq!(
            response.return_data,
            Some(json!({"action": "repeat", "payload": {"n": 3}}))
        );
    }
}
