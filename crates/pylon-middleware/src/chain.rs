//! The ordered middleware chain.

use crate::middleware::{Middleware, PhaseOutcome};
use parking_lot::RwLock;
use pylon_core::events::names;
use pylon_core::{BaseResponse, Events, PylonError, PylonResult, Request};
use serde_json::json;
use std::fmt;
use std::sync::Arc;

/// An ordered, mutable collection of [`Middleware`] trait objects.
///
/// Registration happens at boot; walks happen per request. Every walk
/// operates on a snapshot of the list taken at entry, so re-registration
/// while requests are in flight never affects an ongoing walk.
pub struct MiddlewareChain {
    entries: RwLock<Vec<Arc<dyn Middleware>>>,
    events: Arc<Events>,
}

impl MiddlewareChain {
    /// Creates an empty chain that reports lifecycle events to `events`.
    #[must_use]
    pub fn new(events: Arc<Events>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Appends a middleware to the tail of the chain.
    pub fn add(&self, middleware: Arc<dyn Middleware>) {
        self.entries.write().push(middleware);
    }

    /// Appends several middlewares, preserving their order.
    pub fn add_all(&self, middlewares: impl IntoIterator<Item = Arc<dyn Middleware>>) {
        self.entries.write().extend(middlewares);
    }

    /// Inserts a middleware immediately before the named anchor.
    ///
    /// # Errors
    ///
    /// `Configuration` when no middleware with the anchor name is registered.
    pub fn add_before(&self, anchor: &str, middleware: Arc<dyn Middleware>) -> PylonResult<()> {
        let mut entries = self.entries.write();
        let position = Self::position(&entries, anchor)?;
        entries.insert(position, middleware);
        Ok(())
    }

    /// Inserts a middleware immediately after the named anchor.
    ///
    /// # Errors
    ///
    /// `Configuration` when no middleware with the anchor name is registered.
    pub fn add_after(&self, anchor: &str, middleware: Arc<dyn Middleware>) -> PylonResult<()> {
        let mut entries = self.entries.write();
        let position = Self::position(&entries, anchor)?;
        entries.insert(position + 1, middleware);
        Ok(())
    }

    /// Names of the registered middlewares, in walk order.
    #[must_use]
    pub fn all(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Number of registered middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Walks the chain once.
    ///
    /// Without a response this is the request phase: each middleware's
    /// `on_request` runs head-to-tail until one aborts. With a response it
    /// is the response phase: each middleware's `on_response` runs in the
    /// same order. `middleware.pre_run` and `middleware.post_run` fire
    /// exactly once per call, abort or not.
    ///
    /// # Errors
    ///
    /// The error carried by the first [`PhaseOutcome::Abort`].
    pub fn handle(
        &self,
        request: &mut Request,
        response: Option<&mut BaseResponse>,
    ) -> PylonResult<()> {
        let snapshot: Vec<Arc<dyn Middleware>> = self.entries.read().clone();
        let payload = json!({"request": request.id().to_string(), "uri": request.uri()});
        self.events.emit(names::MIDDLEWARE_PRE_RUN, &payload);

        let result = match response {
            None => Self::request_phase(&snapshot, request),
            Some(response) => {
                for middleware in &snapshot {
                    middleware.on_response(response, request);
                }
                Ok(())
            }
        };

        self.events.emit(names::MIDDLEWARE_POST_RUN, &payload);
        result
    }

    fn request_phase(snapshot: &[Arc<dyn Middleware>], request: &mut Request) -> PylonResult<()> {
        for middleware in snapshot {
            match middleware.on_request(request) {
                PhaseOutcome::Continue => {}
                PhaseOutcome::Abort(error) => {
                    tracing::debug!(
                        middleware = middleware.name(),
                        error = %error,
                        "middleware aborted request"
                    );
                    return Err(error);
                }
            }
        }
        Ok(())
    }

    fn position(entries: &[Arc<dyn Middleware>], anchor: &str) -> PylonResult<usize> {
        entries
            .iter()
            .position(|m| m.name() == anchor)
            .ok_or_else(|| {
                PylonError::configuration(format!("Middleware {anchor} is not registered"))
            })
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("middlewares", &self.all())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use parking_lot::Mutex;
    use pylon_core::ErrorCategory;

    struct Tracer {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        abort: bool,
    }

    impl Tracer {
        fn new(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                log: Arc::clone(log),
                abort: false,
            })
        }

        fn aborting(name: &str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                log: Arc::clone(log),
                abort: true,
            })
        }
    }

    impl Middleware for Tracer {
        fn name(&self) -> &str {
            &self.name
        }

        fn on_request(&self, _request: &mut Request) -> PhaseOutcome {
            self.log.lock().push(format!("req:{}", self.name));
            if self.abort {
                PhaseOutcome::Abort(PylonError::authorization("blocked"))
            } else {
                PhaseOutcome::Continue
            }
        }

        fn on_response(&self, _response: &mut BaseResponse, _request: &Request) {
            self.log.lock().push(format!("res:{}", self.name));
        }
    }

    fn chain() -> MiddlewareChain {
        MiddlewareChain::new(Arc::new(Events::new()))
    }

    #[test]
    fn test_request_phase_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add(Tracer::new("a", &log));
        chain.add(Tracer::new("b", &log));

        let mut request = Request::new(Method::POST, "/api/v1/");
        chain.handle(&mut request, None).unwrap();
        assert_eq!(*log.lock(), vec!["req:a", "req:b"]);
    }

    #[test]
    fn test_response_phase_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add(Tracer::new("a", &log));
        chain.add(Tracer::new("b", &log));

        let mut request = Request::new(Method::POST, "/api/v1/");
        let mut response = BaseResponse::default();
        chain.handle(&mut request, Some(&mut response)).unwrap();
        assert_eq!(*log.lock(), vec!["res:a", "res:b"]);
    }

    #[test]
    fn test_abort_stops_walk() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add(Tracer::new("a", &log));
        chain.add(Tracer::aborting("guard", &log));
        chain.add(Tracer::new("never", &log));

        let mut request = Request::new(Method::POST, "/api/v1/");
        let err = chain.handle(&mut request, None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authorization);
        assert_eq!(*log.lock(), vec!["req:a", "req:guard"]);
    }

    #[test]
    fn test_add_before_after_ordering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add(Tracer::new("head", &log));
        chain.add(Tracer::new("tail", &log));
        chain.add_before("tail", Tracer::new("middle", &log)).unwrap();
        chain.add_after("head", Tracer::new("second", &log)).unwrap();

        assert_eq!(chain.all(), vec!["head", "second", "middle", "tail"]);
    }

    #[test]
    fn test_absent_anchor_is_configuration_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        let err = chain
            .add_before("ghost", Tracer::new("x", &log))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
        let err = chain.add_after("ghost", Tracer::new("x", &log)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_events_fire_once_per_handle() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Events::new());
        let pre = Arc::new(AtomicUsize::new(0));
        let post = Arc::new(AtomicUsize::new(0));
        let pre_inner = Arc::clone(&pre);
        let post_inner = Arc::clone(&post);
        events.on(names::MIDDLEWARE_PRE_RUN, move |_, _| {
            pre_inner.fetch_add(1, Ordering::SeqCst);
        });
        events.on(names::MIDDLEWARE_POST_RUN, move |_, _| {
            post_inner.fetch_add(1, Ordering::SeqCst);
        });

        let chain = MiddlewareChain::new(events);
        chain.add(Tracer::new("a", &log));
        chain.add(Tracer::aborting("guard", &log));

        let mut request = Request::new(Method::POST, "/api/v1/");
        let _ = chain.handle(&mut request, None);
        assert_eq!(pre.load(Ordering::SeqCst), 1);
        assert_eq!(post.load(Ordering::SeqCst), 1);
    }
}
