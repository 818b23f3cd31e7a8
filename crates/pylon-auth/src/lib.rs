//! Authentication for the Pylon framework.
//!
//! Authentication is a chain of [`AuthenticationBackend`] trait objects
//! tried in order until one attaches a
//! [`UserContext`](pylon_core::UserContext) to the request. Backends can
//! restrict themselves to particular services; the chain skips them for
//! everything else.
//!
//! The chain never rejects an unauthenticated request on its own. Services
//! that require a user check the request at dispatch time.

pub mod backend;
pub mod chain;

pub use backend::AuthenticationBackend;
pub use chain::AuthenticationChain;
