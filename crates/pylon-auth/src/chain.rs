//! The ordered authentication chain.

use crate::backend::AuthenticationBackend;
use parking_lot::RwLock;
use pylon_core::events::names;
use pylon_core::{Events, PylonError, PylonResult, Request};
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// An ordered collection of [`AuthenticationBackend`] trait objects.
///
/// The chain tries its backends head-to-tail until one authenticates the
/// request, one fails, or the chain is exhausted. A request nobody vouches
/// for is left unauthenticated; rejecting it is the dispatcher's call, not
/// the chain's.
pub struct AuthenticationChain {
    entries: RwLock<Vec<Arc<dyn AuthenticationBackend>>>,
    events: Arc<Events>,
}

impl AuthenticationChain {
    /// Creates an empty chain that reports lifecycle events to `events`.
    #[must_use]
    pub fn new(events: Arc<Events>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Appends a backend to the tail of the chain.
    pub fn add_backend(&self, backend: Arc<dyn AuthenticationBackend>) {
        self.entries.write().push(backend);
    }

    /// Appends several backends, preserving their order.
    pub fn add_all(&self, backends: impl IntoIterator<Item = Arc<dyn AuthenticationBackend>>) {
        self.entries.write().extend(backends);
    }

    /// Inserts a backend immediately before the named anchor.
    ///
    /// # Errors
    ///
    /// `Configuration` when no backend with the anchor name is registered.
    pub fn add_before(
        &self,
        anchor: &str,
        backend: Arc<dyn AuthenticationBackend>,
    ) -> PylonResult<()> {
        let mut entries = self.entries.write();
        let position = Self::position(&entries, anchor)?;
        entries.insert(position, backend);
        Ok(())
    }

    /// Inserts a backend immediately after the named anchor.
    ///
    /// # Errors
    ///
    /// `Configuration` when no backend with the anchor name is registered.
    pub fn add_after(
        &self,
        anchor: &str,
        backend: Arc<dyn AuthenticationBackend>,
    ) -> PylonResult<()> {
        let mut entries = self.entries.write();
        let position = Self::position(&entries, anchor)?;
        entries.insert(position + 1, backend);
        Ok(())
    }

    /// Names of the registered backends, in walk order.
    #[must_use]
    pub fn backends(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|b| b.name().to_string())
            .collect()
    }

    /// Number of registered backends.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true when no backend is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Runs the chain against a request.
    ///
    /// `auth.pre_run` and `auth.post_run` fire exactly once per call, no
    /// matter how many backends are inspected or how the walk ends. Each
    /// backend is consumed from the walk's snapshot whether it ran or was
    /// skipped, so the walk inspects at most N backends.
    ///
    /// # Errors
    ///
    /// The first backend error encountered; the walk stops there.
    pub fn handle(&self, request: &mut Request) -> PylonResult<()> {
        let payload = json!({"request": request.id().to_string(), "uri": request.uri()});
        self.events.emit(names::AUTH_PRE_RUN, &payload);
        let result = self.walk(request);
        self.events.emit(names::AUTH_POST_RUN, &payload);
        result
    }

    fn walk(&self, request: &mut Request) -> PylonResult<()> {
        let mut remaining: VecDeque<Arc<dyn AuthenticationBackend>> =
            self.entries.read().iter().cloned().collect();

        while !request.is_authenticated() {
            let Some(backend) = remaining.pop_front() else {
                break;
            };

            if Self::skips(backend.as_ref(), request) {
                tracing::debug!(
                    backend = backend.name(),
                    service = request.service().unwrap_or(""),
                    "backend not applicable to service, skipping"
                );
                continue;
            }

            backend.before_run(request);
            let attempt = backend.authenticate(request);
            backend.after_run(request);

            match attempt {
                Ok(Some(user)) => {
                    tracing::debug!(
                        backend = backend.name(),
                        user_id = user.user_id,
                        "request authenticated"
                    );
                    request.set_auth(user);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::debug!(
                        backend = backend.name(),
                        error = %error,
                        "backend failed, aborting walk"
                    );
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    fn skips(backend: &dyn AuthenticationBackend, request: &Request) -> bool {
        let limited = backend.limit_services();
        if limited.is_empty() {
            return false;
        }
        match request.service() {
            Some(service) => !limited.iter().any(|s| s == service),
            // Service unknown yet (e.g. GET before route attributes are
            // filled): a restricted backend cannot claim it.
            None => true,
        }
    }

    fn position(entries: &[Arc<dyn AuthenticationBackend>], anchor: &str) -> PylonResult<usize> {
        entries
            .iter()
            .position(|b| b.name() == anchor)
            .ok_or_else(|| {
                PylonError::configuration(format!("Authentication backend {anchor} is not registered"))
            })
    }
}

impl fmt::Debug for AuthenticationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationChain")
            .field("backends", &self.backends())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use parking_lot::Mutex;
    use pylon_core::{ErrorCategory, UserContext};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Pass,
        Authenticate(&'static str),
        Fail,
    }

    struct FakeBackend {
        name: String,
        behavior: Behavior,
        limited: Vec<String>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        fn new(name: &str, behavior: Behavior, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Self::limited_to(name, behavior, Vec::new(), log)
        }

        fn limited_to(
            name: &str,
            behavior: Behavior,
            limited: Vec<String>,
            log: &Arc<Mutex<Vec<String>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                behavior,
                limited,
                log: Arc::clone(log),
            })
        }
    }

    impl AuthenticationBackend for FakeBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn limit_services(&self) -> &[String] {
            &self.limited
        }

        fn before_run(&self, _request: &Request) {
            self.log.lock().push(format!("before:{}", self.name));
        }

        fn authenticate(&self, _request: &Request) -> PylonResult<Option<UserContext>> {
            self.log.lock().push(format!("auth:{}", self.name));
            match &self.behavior {
                Behavior::Pass => Ok(None),
                Behavior::Authenticate(user) => Ok(Some(UserContext::new(*user))),
                Behavior::Fail => Err(PylonError::authentication("Bad credentials")),
            }
        }

        fn after_run(&self, _request: &Request) {
            self.log.lock().push(format!("after:{}", self.name));
        }
    }

    fn chain() -> AuthenticationChain {
        AuthenticationChain::new(Arc::new(Events::new()))
    }

    fn request_for(service: &str) -> Request {
        Request::new(Method::POST, "/api/v1/")
            .with_data(json!({"service": service, "action": "run"}))
    }

    #[test]
    fn test_first_success_stops_walk() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::new("cookie", Behavior::Pass, &log));
        chain.add_backend(FakeBackend::new("token", Behavior::Authenticate("u-1"), &log));
        chain.add_backend(FakeBackend::new("never", Behavior::Authenticate("u-2"), &log));

        let mut request = request_for("auth");
        chain.handle(&mut request).unwrap();
        assert!(request.is_authenticated());
        assert_eq!(request.auth().unwrap().user_id, "u-1");
        assert_eq!(
            *log.lock(),
            vec![
                "before:cookie",
                "auth:cookie",
                "after:cookie",
                "before:token",
                "auth:token",
                "after:token"
            ]
        );
    }

    #[test]
    fn test_exhausted_chain_leaves_unauthenticated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::new("a", Behavior::Pass, &log));
        chain.add_backend(FakeBackend::new("b", Behavior::Pass, &log));

        let mut request = request_for("auth");
        chain.handle(&mut request).unwrap();
        assert!(!request.is_authenticated());
    }

    #[test]
    fn test_limited_backend_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::limited_to(
            "admin_only",
            Behavior::Authenticate("admin"),
            vec!["admin".to_string()],
            &log,
        ));
        chain.add_backend(FakeBackend::new("open", Behavior::Authenticate("u-3"), &log));

        let mut request = request_for("orders");
        chain.handle(&mut request).unwrap();
        assert_eq!(request.auth().unwrap().user_id, "u-3");
        assert!(!log.lock().iter().any(|l| l.contains("admin_only")));
    }

    #[test]
    fn test_limited_backend_applies_to_named_service() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::limited_to(
            "admin_only",
            Behavior::Authenticate("admin"),
            vec!["admin".to_string()],
            &log,
        ));

        let mut request = request_for("admin");
        chain.handle(&mut request).unwrap();
        assert_eq!(request.auth().unwrap().user_id, "admin");
    }

    #[test]
    fn test_backend_error_aborts() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::new("broken", Behavior::Fail, &log));
        chain.add_backend(FakeBackend::new("never", Behavior::Authenticate("u"), &log));

        let mut request = request_for("auth");
        let err = chain.handle(&mut request).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert!(!request.is_authenticated());
        assert!(!log.lock().iter().any(|l| l.contains("never")));
    }

    #[test]
    fn test_events_fire_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(Events::new());
        let pre = Arc::new(AtomicUsize::new(0));
        let post = Arc::new(AtomicUsize::new(0));
        let pre_inner = Arc::clone(&pre);
        let post_inner = Arc::clone(&post);
        events.on(names::AUTH_PRE_RUN, move |_, _| {
            pre_inner.fetch_add(1, Ordering::SeqCst);
        });
        events.on(names::AUTH_POST_RUN, move |_, _| {
            post_inner.fetch_add(1, Ordering::SeqCst);
        });

        let chain = AuthenticationChain::new(events);
        chain.add_backend(FakeBackend::new("a", Behavior::Pass, &log));
        chain.add_backend(FakeBackend::new("b", Behavior::Fail, &log));
        chain.add_backend(FakeBackend::new("c", Behavior::Pass, &log));

        let mut request = request_for("auth");
        let _ = chain.handle(&mut request);
        assert_eq!(pre.load(Ordering::SeqCst), 1);
        assert_eq!(post.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_anchor_insertion() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = chain();
        chain.add_backend(FakeBackend::new("head", Behavior::Pass, &log));
        chain.add_backend(FakeBackend::new("tail", Behavior::Pass, &log));
        chain
            .add_before("tail", FakeBackend::new("mid", Behavior::Pass, &log))
            .unwrap();
        chain
            .add_after("head", FakeBackend::new("second", Behavior::Pass, &log))
            .unwrap();
        assert_eq!(chain.backends(), vec!["head", "second", "mid", "tail"]);

        let err = chain
            .add_before("ghost", FakeBackend::new("x", Behavior::Pass, &log))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
