//! Per-request state.
//!
//! A [`Request`] is created from the incoming HTTP request, mutated by the
//! middleware and authentication chains, and destroyed when the response is
//! sent. The authentication chain attaches a [`UserContext`] to mark the
//! request authenticated.

use http::{HeaderMap, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// URL scheme a request arrived on, and that routes may be constrained to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// Returns the lowercase scheme name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(format!("unknown scheme: {other}")),
        }
    }
}

/// The authenticated user attached to a request by the authentication chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Stable identifier of the user.
    pub user_id: String,
    /// Optional display or login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Roles granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Fine-grained permissions granted to the user.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Backend-specific extras (claims, profile fields, ...).
    #[serde(default)]
    pub extras: Value,
}

impl UserContext {
    /// Creates a user context for the given user id.
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Self::default()
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Returns true if the user holds the given permission.
    #[must_use]
    pub fn can(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

/// An in-flight API request.
///
/// For POST dispatch the `service` and `action` live in the JSON body; for GET
/// dispatch they are path segments copied into the attributes by the route
/// match. [`Request::service`] and [`Request::action`] read the source the
/// method owns first, so a GET body cannot redirect the pair its path names.
#[derive(Debug, Clone)]
pub struct Request {
    id: Uuid,
    method: Method,
    path: String,
    scheme: Scheme,
    headers: HeaderMap,
    query: HashMap<String, String>,
    data: Value,
    attributes: HashMap<String, String>,
    auth: Option<Arc<UserContext>>,
    port: Option<u16>,
    response_headers: HeaderMap,
}

impl Request {
    /// Creates a request for the given method and path.
    ///
    /// Defaults: http scheme, empty JSON object body, no attributes.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            method,
            path: path.into(),
            scheme: Scheme::Http,
            headers: HeaderMap::new(),
            query: HashMap::new(),
            data: Value::Object(serde_json::Map::new()),
            attributes: HashMap::new(),
            auth: None,
            port: None,
            response_headers: HeaderMap::new(),
        }
    }

    /// Sets the scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Sets the parsed JSON body.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query = query;
        self
    }

    /// Sets the request headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the local port the request arrived on.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Unique identifier of this request, for log correlation.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The scheme the request arrived on.
    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The query parameters.
    #[must_use]
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// The parsed JSON body.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The local port, when known.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Method and path in one string, for logging.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("{}::{}", self.method, self.path)
    }

    /// Returns a path attribute filled in by the route match.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Sets a path attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Returns a string field from the JSON body.
    #[must_use]
    pub fn data_field(&self, name: &str) -> Option<&str> {
        self.data.get(name).and_then(Value::as_str)
    }

    /// The target service name. Path attributes win for GET requests, the
    /// body wins for everything else.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.dispatch_field("service")
    }

    /// The target action name, extracted like [`Request::service`].
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.dispatch_field("action")
    }

    // GET names the pair in the path, so the route attributes are
    // authoritative there and any body copy is ignored unless the path
    // left the field unset.
    fn dispatch_field(&self, name: &str) -> Option<&str> {
        if self.method == Method::GET {
            self.attribute(name).or_else(|| self.data_field(name))
        } else {
            self.data_field(name).or_else(|| self.attribute(name))
        }
    }

    /// Whether an authentication backend has attached a user context.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// The attached user context, if authenticated.
    #[must_use]
    pub fn auth(&self) -> Option<&Arc<UserContext>> {
        self.auth.as_ref()
    }

    /// Attaches a user context, marking the request authenticated.
    pub fn set_auth(&mut self, user: UserContext) {
        self.auth = Some(Arc::new(user));
    }

    /// Headers that middleware has asked the transport to attach to the
    /// outgoing HTTP response.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Mutable access to the outgoing response headers.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scheme_parse() {
        assert_eq!("https".parse::<Scheme>().unwrap(), Scheme::Https);
        assert_eq!("HTTP".parse::<Scheme>().unwrap(), Scheme::Http);
        assert!("gopher".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_service_from_body() {
        let request = Request::new(Method::POST, "/api/v1/")
            .with_data(json!({"service": "auth", "action": "login"}));
        assert_eq!(request.service(), Some("auth"));
        assert_eq!(request.action(), Some("login"));
    }

    #[test]
    fn test_service_from_attributes() {
        let mut request = Request::new(Method::GET, "/api/v1/auth/login/");
        assert_eq!(request.service(), None);
        request.set_attribute("service", "auth");
        request.set_attribute("action", "login");
        assert_eq!(request.service(), Some("auth"));
        assert_eq!(request.action(), Some("login"));
    }

    #[test]
    fn test_get_attributes_beat_body() {
        let mut request = Request::new(Method::GET, "/api/v1/public/list/")
            .with_data(json!({"service": "internal", "action": "purge"}));
        request.set_attribute("service", "public");
        request.set_attribute("action", "list");
        assert_eq!(request.service(), Some("public"));
        assert_eq!(request.action(), Some("list"));
    }

    #[test]
    fn test_post_body_beats_attributes() {
        let mut request = Request::new(Method::POST, "/api/v1/")
            .with_data(json!({"service": "auth", "action": "login"}));
        request.set_attribute("service", "stale");
        assert_eq!(request.service(), Some("auth"));
    }

    #[test]
    fn test_authentication_marker() {
        let mut request = Request::new(Method::POST, "/api/v1/");
        assert!(!request.is_authenticated());
        request.set_auth(UserContext::new("u-1").with_username("alice"));
        assert!(request.is_authenticated());
        assert_eq!(request.auth().unwrap().username.as_deref(), Some("alice"));
    }

    #[test]
    fn test_user_context_can() {
        let mut user = UserContext::new("u-2");
        user.permissions.push("orders.read".to_string());
        assert!(user.can("orders.read"));
        assert!(!user.can("orders.write"));
    }

    #[test]
    fn test_uri_formatting() {
        let request = Request::new(Method::GET, "/api/v1/ping");
        assert_eq!(request.uri(), "GET::/api/v1/ping");
    }
}
