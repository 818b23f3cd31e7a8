//! The request kernel.
//!
//! The kernel owns the per-request pipeline: middleware request phase,
//! authentication, dispatch, middleware response phase. It is the last
//! error boundary; whatever reaches it comes back as an envelope, never a
//! panic or a bare error.

use pylon_auth::AuthenticationChain;
use pylon_core::events::names;
use pylon_core::{BaseResponse, PylonResult, Realm, Request};
use pylon_middleware::{MiddlewareChain, PREFLIGHT_ATTRIBUTE};
use pylon_router::Dispatcher;
use serde_json::json;
use std::sync::Arc;

/// Runs requests through the chains and the dispatcher.
pub struct Kernel {
    realm: Arc<Realm>,
    middleware: Arc<MiddlewareChain>,
    auth: Arc<AuthenticationChain>,
    dispatcher: Dispatcher,
}

impl Kernel {
    /// Assembles a kernel. Most applications go through
    /// [`AppBuilder`](crate::AppBuilder) instead.
    #[must_use]
    pub fn new(
        realm: Arc<Realm>,
        middleware: Arc<MiddlewareChain>,
        auth: Arc<AuthenticationChain>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            realm,
            middleware,
            auth,
            dispatcher,
        }
    }

    /// The application realm.
    #[must_use]
    pub fn realm(&self) -> &Arc<Realm> {
        &self.realm
    }

    /// The middleware chain.
    #[must_use]
    pub fn middleware(&self) -> &Arc<MiddlewareChain> {
        &self.middleware
    }

    /// The authentication chain.
    #[must_use]
    pub fn auth(&self) -> &Arc<AuthenticationChain> {
        &self.auth
    }

    /// Prepares a request for dispatch: fires `kernel.pre_boot`, runs the
    /// middleware request phase, then the authentication chain.
    ///
    /// # Errors
    ///
    /// A middleware abort or an authentication backend failure.
    pub fn boot(&self, request: &mut Request) -> PylonResult<()> {
        self.realm.events().emit(
            names::KERNEL_PRE_BOOT,
            &json!({"request": request.id().to_string(), "uri": request.uri()}),
        );
        self.middleware.handle(request, None)?;
        self.auth.handle(request)?;
        Ok(())
    }

    /// Runs the middleware response phase. After this the response is
    /// final.
    pub fn terminate(&self, response: &mut BaseResponse, request: &mut Request) {
        if let Err(error) = self.middleware.handle(request, Some(response)) {
            // Response-phase middlewares cannot abort; log and keep going.
            tracing::warn!(error = %error, "middleware error during terminate");
        }
    }

    /// Runs a request end to end and always produces an envelope.
    ///
    /// Errors escaping boot or dispatch are logged with the request's
    /// method and URI and rendered with the configured envelope codes;
    /// clients never see anything but the envelope.
    pub fn handle(&self, request: &mut Request) -> BaseResponse {
        let mut response = match self.run(request) {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    method = %request.method(),
                    uri = request.uri(),
                    error = %error,
                    "request failed"
                );
                error.to_response(self.realm.codes())
            }
        };
        self.terminate(&mut response, request);
        response
    }

    fn run(&self, request: &mut Request) -> PylonResult<BaseResponse> {
        self.boot(request)?;
        if request.attribute(PREFLIGHT_ATTRIBUTE).is_some() {
            // CORS preflight: headers are already on the request; nothing
            // to dispatch.
            return Ok(BaseResponse::default());
        }
        self.dispatcher.dispatch(request)
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("middlewares", &self.middleware.all())
            .field("backends", &self.auth.backends())
            .finish()
    }
}
