//! The middleware capability trait.

use pylon_core::{BaseResponse, PylonError, Request};

/// What a middleware's request phase decided.
#[derive(Debug)]
pub enum PhaseOutcome {
    /// Keep walking the chain.
    Continue,
    /// Stop the walk; the error is rendered into the response envelope.
    Abort(PylonError),
}

impl PhaseOutcome {
    /// Returns true for [`PhaseOutcome::Continue`].
    #[must_use]
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }
}

/// A middleware runs against every request twice: once on the way in (before
/// authentication and dispatch) and once on the way out (against the
/// response envelope).
///
/// Middlewares are registered as trait objects on the
/// [`MiddlewareChain`](crate::MiddlewareChain) and addressed by [`name`]
/// for anchor-relative insertion.
///
/// [`name`]: Middleware::name
pub trait Middleware: Send + Sync {
    /// Stable name used for ordering anchors and logs.
    fn name(&self) -> &str;

    /// Request phase. Runs before authentication and dispatch; may mutate
    /// the request or abort the walk.
    fn on_request(&self, request: &mut Request) -> PhaseOutcome;

    /// Response phase. Runs after dispatch against the outgoing envelope.
    /// Default: do nothing.
    fn on_response(&self, _response: &mut BaseResponse, _request: &Request) {}
}
