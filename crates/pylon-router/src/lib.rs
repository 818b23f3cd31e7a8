//! Routing and dispatch for the Pylon framework.
//!
//! Pylon routes are few and fixed: every registered API version gets a POST
//! dispatch root, a GET dispatch path carrying `{service}/{action}`
//! segments, and a ping route. The interesting lookup happens after the
//! route match, when the [`Dispatcher`] resolves the addressed service from
//! the [`ServiceRegistry`] and runs the action.
//!
//! # Example
//!
//! ```
//! use pylon_router::{Router, Switch, Service, Dispatcher};
//! use pylon_core::{BaseResponse, PylonResult, Realm, Request};
//! use serde_json::json;
//! use std::sync::Arc;
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
//!         Ok(BaseResponse::ok(json!({"action": action})))
//!     }
//! }
//!
//! struct AppSwitch;
//!
//! impl Switch for AppSwitch {
//!     fn services(&self) -> Vec<Arc<dyn Service>> {
//!         vec![Arc::new(Hello)]
//!     }
//! }
//!
//! let router = Arc::new(Router::new());
//! router.switch(&AppSwitch, "v1").unwrap();
//! let dispatcher = Dispatcher::new(router, Realm::builder().build());
//!
//! let mut request = Request::new(http::Method::POST, "/api/v1/")
//!     .with_data(json!({"service": "hello", "action": "wave"}));
//! let response = dispatcher.dispatch(&mut request).unwrap();
//! assert_eq!(response.return_code, 0);
//! ```

pub mod dispatch;
pub mod method_map;
mod node;
pub mod params;
pub mod router;
pub mod switch;
pub mod table;

pub use dispatch::{cache_response, fingerprint, Dispatcher};
pub use method_map::{Endpoint, MethodMap, RouteTarget};
pub use params::Params;
pub use router::{Router, SwitchOptions};
pub use switch::{Service, ServiceRegistry, Switch};
pub use table::{RouteMatch, RouteTable};
