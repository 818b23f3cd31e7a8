//! Core types for the Pylon framework.
//!
//! Pylon is a switch-dispatch JSON API framework: clients address a
//! `service` + `action` pair rather than a resource URL, and every reply is
//! the same camelCase envelope. This crate holds the pieces everything else
//! builds on:
//!
//! - [`Realm`] — the explicitly-passed application container,
//! - [`Environment`] and [`CacheStore`] — configuration and caching,
//! - [`Events`] — lifecycle hooks,
//! - [`Request`], [`UserContext`], [`BaseResponse`] — per-request state and
//!   the wire envelope,
//! - [`PylonError`] — the error taxonomy,
//! - [`logging`] — tracing setup and secret redaction.
//!
//! # Example
//!
//! ```
//! use pylon_core::{Realm, BaseResponse};
//! use serde_json::json;
//!
//! let realm = Realm::builder().build();
//! realm.set("motd", "welcome".to_string());
//! let motd: std::sync::Arc<String> = realm.get("motd").unwrap();
//! let response = BaseResponse::ok(json!({"motd": *motd}));
//! assert_eq!(response.return_code, 0);
//! ```

pub mod cache;
pub mod env;
pub mod error;
pub mod events;
pub mod logging;
pub mod realm;
pub mod request;
pub mod response;
pub mod snapshot;

pub use cache::{CacheStore, MemoryCache};
pub use env::Environment;
pub use error::{ErrorCategory, PylonError, PylonResult, ResponseCodes};
pub use events::Events;
pub use logging::{init_logging, LogConfig};
pub use realm::{Realm, RealmBuilder};
pub use request::{Request, Scheme, UserContext};
pub use response::BaseResponse;
pub use snapshot::RegistrySnapshot;
