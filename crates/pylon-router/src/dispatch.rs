//! The dispatch processor.
//!
//! Once the kernel's chains have run, the dispatcher resolves the request's
//! route, finds the addressed service, invokes the action, and translates
//! request-scoped failures into the uniform envelope. Only internal and
//! configuration errors escape to the kernel backstop.

use crate::method_map::Endpoint;
use crate::router::Router;
use pylon_core::events::names;
use pylon_core::{BaseResponse, ErrorCategory, PylonResult, Realm, Request};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Builds the cache fingerprint for a service/action pair: lowercase, with
/// every run of non-alphanumeric characters collapsed to one underscore.
#[must_use]
pub fn fingerprint(service: &str, action: &str) -> String {
    let mut out = String::with_capacity(service.len() + action.len() + 1);
    for raw in [service, action] {
        if !out.is_empty() {
            out.push('_');
        }
        let mut last_was_sep = false;
        for c in raw.trim().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c.to_ascii_lowercase());
                last_was_sep = false;
            } else if !last_was_sep && !out.is_empty() {
                out.push('_');
                last_was_sep = true;
            }
        }
    }
    out
}

/// Publishes an envelope under the service/action fingerprint so the next
/// dispatch of the same pair returns it without invoking the service.
pub fn cache_response(
    realm: &Realm,
    service: &str,
    action: &str,
    response: &BaseResponse,
    ttl: Option<Duration>,
) {
    if let Ok(value) = serde_json::to_value(response) {
        realm
            .cache()
            .set(&fingerprint(service, action), value, ttl, false);
    }
}

/// Resolves routes and runs service actions.
pub struct Dispatcher {
    router: Arc<Router>,
    realm: Arc<Realm>,
}

impl Dispatcher {
    /// Creates a dispatcher over a router and realm.
    #[must_use]
    pub fn new(router: Arc<Router>, realm: Arc<Realm>) -> Self {
        Self { router, realm }
    }

    /// The router this dispatcher resolves against.
    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Dispatches a request to its endpoint.
    ///
    /// Request-scoped failures (missing route, missing service or action
    /// keys, unknown service, and any `NotFound` / `Authentication` /
    /// `Authorization` / `Resolution` error an action raises) come back as
    /// `Ok` envelopes carrying the configured code.
    ///
    /// # Errors
    ///
    /// `Internal` and `Configuration` errors raised by actions; the kernel
    /// backstop renders those.
    pub fn dispatch(&self, request: &mut Request) -> PylonResult<BaseResponse> {
        let method = request.method().clone();
        let path = request.path().to_string();
        let Some(matched) = self.router.resolve(&method, &path, request.scheme()) else {
            return Ok(self.not_found(format!(
                "Route {} does not exist",
                request.uri()
            )));
        };

        for (name, value) in matched.params.iter() {
            request.set_attribute(name, value);
        }

        match matched.endpoint {
            Endpoint::Ping { .. } => Ok(self.ping(request)),
            Endpoint::Processor { version } => self.process(request, &version),
        }
    }

    fn process(&self, request: &mut Request, version: &str) -> PylonResult<BaseResponse> {
        let Some(service) = request.service().map(str::to_string) else {
            return Ok(self.not_found("Service name is required"));
        };
        let Some(action) = request.action().map(str::to_string) else {
            return Ok(self.not_found("Action name is required"));
        };

        let key = fingerprint(&service, &action);
        if let Some(cached) = self.realm.cache().get(&key, false) {
            if let Ok(response) = serde_json::from_value::<BaseResponse>(cached) {
                tracing::debug!(fingerprint = key, "serving cached response");
                return Ok(response);
            }
            // Unparseable cache entries are dropped, not served.
            self.realm.cache().forget(&key, false);
        }

        self.realm.events().emit(
            names::SWITCH_PRE_RUN,
            &json!({
                "request": request.id().to_string(),
                "service": service,
                "action": action,
            }),
        );

        let Some(resolved) = self.router.registry().resolve(version, &service) else {
            return Ok(self.not_found(format!("Service {service} not found")));
        };

        match resolved.process_action(&action, request, &self.realm) {
            Ok(response) => Ok(response),
            Err(error) => match error.category() {
                ErrorCategory::NotFound
                | ErrorCategory::Authentication
                | ErrorCategory::Authorization
                | ErrorCategory::Resolution => {
                    tracing::debug!(service, action, error = %error, "action failed");
                    Ok(error.to_response(self.realm.codes()))
                }
                ErrorCategory::Configuration | ErrorCategory::Internal => Err(error),
            },
        }
    }

    /// The ping envelope. Framework name and version are always present;
    /// the request's port, uri, and scheme appear only in debug mode.
    fn ping(&self, request: &Request) -> BaseResponse {
        let mut data = json!({
            "framework": "Pylon",
            "version": env!("CARGO_PKG_VERSION"),
        });
        if self.realm.is_debug() {
            data["port"] = json!(request.port());
            data["uri"] = json!(request.uri());
            data["scheme"] = json!(request.scheme().as_str());
        }
        BaseResponse::message("pong", Some(data))
    }

    fn not_found(&self, message: impl Into<String>) -> BaseResponse {
        BaseResponse::error(self.realm.codes().not_found, message.into())
    }
}
