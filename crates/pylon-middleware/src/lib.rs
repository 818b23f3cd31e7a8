//! Middleware for the Pylon framework.
//!
//! A [`Middleware`] sees every request twice: `on_request` before
//! authentication and dispatch, `on_response` against the outgoing envelope.
//! Middlewares live on a [`MiddlewareChain`] in registration order, with
//! anchor-relative insertion for libraries that need to slot themselves
//! around others.
//!
//! # Example
//!
//! ```
//! use pylon_middleware::{Middleware, MiddlewareChain, PhaseOutcome};
//! use pylon_core::{Events, Request};
//! use std::sync::Arc;
//!
//! struct RequireJson;
//!
//! impl Middleware for RequireJson {
//!     fn name(&self) -> &str {
//!         "require_json"
//!     }
//!
//!     fn on_request(&self, request: &mut Request) -> PhaseOutcome {
//!         if request.data().is_object() {
//!             PhaseOutcome::Continue
//!         } else {
//!             PhaseOutcome::Abort(pylon_core::PylonError::not_found("expected a JSON body"))
//!         }
//!     }
//! }
//!
//! let chain = MiddlewareChain::new(Arc::new(Events::new()));
//! chain.add(Arc::new(RequireJson));
//! assert_eq!(chain.all(), vec!["require_json"]);
//! ```

pub mod builtins;
pub mod chain;
pub mod middleware;

pub use builtins::{CorsMiddleware, RequestLogMiddleware, PREFLIGHT_ATTRIBUTE};
pub use chain::MiddlewareChain;
pub use middleware::{Middleware, PhaseOutcome};
