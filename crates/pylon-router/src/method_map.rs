//! Per-path method and scheme constraints.

use http::Method;
use pylon_core::Scheme;

/// What a matched route points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// The switch dispatcher for a version.
    Processor {
        /// Normalized version segment (e.g. `v1`).
        version: String,
    },
    /// The health/ping endpoint for a version.
    Ping {
        /// Normalized version segment.
        version: String,
    },
}

impl Endpoint {
    /// The version segment this endpoint belongs to.
    #[must_use]
    pub fn version(&self) -> &str {
        match self {
            Self::Processor { version } | Self::Ping { version } => version,
        }
    }
}

/// An endpoint plus the schemes it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTarget {
    /// Where the route dispatches to.
    pub endpoint: Endpoint,
    /// Schemes the route answers on. Requests arriving on any other scheme
    /// do not match.
    pub schemes: Vec<Scheme>,
}

impl RouteTarget {
    /// Creates a target accepting the given schemes.
    #[must_use]
    pub fn new(endpoint: Endpoint, schemes: Vec<Scheme>) -> Self {
        Self { endpoint, schemes }
    }

    /// Returns true when the target answers on `scheme`.
    #[must_use]
    pub fn allows(&self, scheme: Scheme) -> bool {
        self.schemes.contains(&scheme)
    }
}

/// Maps the HTTP methods the dispatcher understands to route targets for a
/// single path.
#[derive(Debug, Clone, Default)]
pub struct MethodMap {
    get: Option<RouteTarget>,
    post: Option<RouteTarget>,
}

impl MethodMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GET target.
    #[must_use]
    pub fn get(mut self, target: RouteTarget) -> Self {
        self.get = Some(target);
        self
    }

    /// Sets the POST target.
    #[must_use]
    pub fn post(mut self, target: RouteTarget) -> Self {
        self.post = Some(target);
        self
    }

    /// Looks up the target for a method.
    #[must_use]
    pub fn target(&self, method: &Method) -> Option<&RouteTarget> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            _ => None,
        }
    }

    /// Folds another map into this one. Methods set in `other` win.
    pub fn merge(&mut self, other: MethodMap) {
        if other.get.is_some() {
            self.get = other.get;
        }
        if other.post.is_some() {
            self.post = other.post;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(version: &str) -> Endpoint {
        Endpoint::Processor {
            version: version.to_string(),
        }
    }

    #[test]
    fn test_target_lookup() {
        let map = MethodMap::new()
            .post(RouteTarget::new(processor("v1"), vec![Scheme::Https]))
            .get(RouteTarget::new(processor("v1"), vec![Scheme::Http]));
        assert!(map.target(&Method::POST).is_some());
        assert!(map.target(&Method::GET).is_some());
        assert!(map.target(&Method::DELETE).is_none());
    }

    #[test]
    fn test_scheme_allowance() {
        let target = RouteTarget::new(processor("v1"), vec![Scheme::Https]);
        assert!(target.allows(Scheme::Https));
        assert!(!target.allows(Scheme::Http));
    }

    #[test]
    fn test_merge_prefers_other() {
        let mut map = MethodMap::new().get(RouteTarget::new(processor("v1"), vec![Scheme::Http]));
        map.merge(MethodMap::new().post(RouteTarget::new(processor("v2"), vec![Scheme::Http])));
        assert_eq!(map.target(&Method::GET).map(|t| t.endpoint.version()), Some("v1"));
        assert_eq!(map.target(&Method::POST).map(|t| t.endpoint.version()), Some("v2"));
    }
}
