//! Middlewares that ship with the framework.

use crate::middleware::{Middleware, PhaseOutcome};
use http::header::{HeaderName, HeaderValue};
use http::Method;
use pylon_core::logging::{hidden_keys, redact};
use pylon_core::{BaseResponse, Environment, Request};
use std::collections::HashSet;

/// Attribute set on a request when a CORS preflight should short-circuit
/// dispatch. The kernel answers such requests without routing them.
pub const PREFLIGHT_ATTRIBUTE: &str = "cors.preflight";

/// Logs every request and its response code, with sensitive body fields
/// masked.
pub struct RequestLogMiddleware {
    hidden: HashSet<String>,
}

impl RequestLogMiddleware {
    /// Creates the middleware with the hidden-key set resolved from the
    /// environment.
    #[must_use]
    pub fn new(env: &Environment) -> Self {
        Self {
            hidden: hidden_keys(env),
        }
    }
}

impl Middleware for RequestLogMiddleware {
    fn name(&self) -> &str {
        "request_log"
    }

    fn on_request(&self, request: &mut Request) -> PhaseOutcome {
        let body = redact(request.data(), &self.hidden);
        tracing::info!(
            request_id = %request.id(),
            method = %request.method(),
            path = request.path(),
            data = %body,
            "request received"
        );
        PhaseOutcome::Continue
    }

    fn on_response(&self, response: &mut BaseResponse, request: &Request) {
        tracing::info!(
            request_id = %request.id(),
            return_code = response.return_code,
            "request completed"
        );
    }
}

/// Attaches CORS headers to every response and short-circuits `OPTIONS`
/// preflights before authentication and dispatch.
pub struct CorsMiddleware {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
}

impl CorsMiddleware {
    /// Creates a permissive configuration: any origin, the methods the
    /// dispatcher understands, and the usual JSON request headers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }

    /// Restricts the allowed origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allow_origin = origin.into();
        self
    }

    /// Overrides the allowed request headers.
    #[must_use]
    pub fn allow_headers(mut self, headers: impl Into<String>) -> Self {
        self.allow_headers = headers.into();
        self
    }

    fn apply_headers(&self, request: &mut Request) {
        let pairs = [
            ("access-control-allow-origin", self.allow_origin.as_str()),
            ("access-control-allow-methods", self.allow_methods.as_str()),
            ("access-control-allow-headers", self.allow_headers.as_str()),
        ];
        for (name, value) in pairs {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                request.response_headers_mut().insert(name, value);
            }
        }
    }
}

impl Default for CorsMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "cors"
    }

    fn on_request(&self, request: &mut Request) -> PhaseOutcome {
        self.apply_headers(request);
        if request.method() == Method::OPTIONS {
            request.set_attribute(PREFLIGHT_ATTRIBUTE, "1");
        }
        PhaseOutcome::Continue
    }
}
