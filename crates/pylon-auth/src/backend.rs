//! The authentication backend trait.

use pylon_core::{PylonResult, Request, UserContext};

/// One way of authenticating a request: a session cookie, a bearer token,
/// an API key, a signature scheme.
///
/// Backends are registered on the
/// [`AuthenticationChain`](crate::AuthenticationChain) in the order they
/// should be tried. A backend that cannot vouch for the request returns
/// `Ok(None)` and the chain moves on; returning a [`UserContext`]
/// authenticates the request and stops the walk; returning an error aborts
/// the request.
pub trait AuthenticationBackend: Send + Sync {
    /// Stable name used for ordering anchors and logs.
    fn name(&self) -> &str;

    /// Services this backend applies to. Empty means every service.
    ///
    /// When a request targets a service outside this list the chain skips
    /// the backend without invoking it.
    fn limit_services(&self) -> &[String] {
        &[]
    }

    /// Runs before [`authenticate`](Self::authenticate) on each applicable
    /// request. Default: do nothing.
    fn before_run(&self, _request: &Request) {}

    /// Attempts to authenticate the request.
    ///
    /// # Errors
    ///
    /// An error aborts the whole walk; a malformed credential a backend
    /// recognizes as its own is an error, an absent one is `Ok(None)`.
    fn authenticate(&self, request: &Request) -> PylonResult<Option<UserContext>>;

    /// Runs after [`authenticate`](Self::authenticate), whatever it
    /// returned. Default: do nothing.
    fn after_run(&self, _request: &Request) {}
}
