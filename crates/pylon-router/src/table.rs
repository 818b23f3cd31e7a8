//! The route table.

use crate::method_map::{Endpoint, MethodMap};
use crate::node::Node;
use crate::params::Params;
use http::Method;
use pylon_core::Scheme;

/// A successful route match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    /// Where to dispatch.
    pub endpoint: Endpoint,
    /// Captured path parameters.
    pub params: Params,
}

/// Radix-tree route table mapping paths to method/scheme-constrained
/// endpoints.
#[derive(Debug, Default)]
pub struct RouteTable {
    root: Node,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a path pattern. Repeated inserts at the same path merge
    /// their method maps.
    pub fn insert(&mut self, path: &str, map: MethodMap) {
        self.root.insert(path, map);
    }

    /// Matches a request. Returns `None` when the path is unknown, the
    /// method is not registered for it, or the route does not answer on the
    /// request's scheme.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str, scheme: Scheme) -> Option<RouteMatch> {
        let (map, params) = self.root.match_path(path)?;
        let target = map.target(method)?;
        if !target.allows(scheme) {
            return None;
        }
        Some(RouteMatch {
            endpoint: target.endpoint.clone(),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method_map::RouteTarget;

    fn table_v1() -> RouteTable {
        let mut table = RouteTable::new();
        let processor = Endpoint::Processor {
            version: "v1".to_string(),
        };
        table.insert(
            "/api/v1/",
            MethodMap::new().post(RouteTarget::new(
                processor.clone(),
                vec![Scheme::Https, Scheme::Http],
            )),
        );
        table.insert(
            "/api/v1/{service}/{action}/",
            MethodMap::new().get(RouteTarget::new(processor, vec![Scheme::Https])),
        );
        table
    }

    #[test]
    fn test_match_post_root() {
        let table = table_v1();
        let matched = table
            .match_route(&Method::POST, "/api/v1/", Scheme::Http)
            .unwrap();
        assert_eq!(matched.endpoint.version(), "v1");
        assert!(matched.params.is_empty());
    }

    #[test]
    fn test_method_mismatch() {
        let table = table_v1();
        assert!(table
            .match_route(&Method::DELETE, "/api/v1/", Scheme::Http)
            .is_none());
    }

    #[test]
    fn test_scheme_mismatch() {
        let table = table_v1();
        assert!(table
            .match_route(&Method::GET, "/api/v1/auth/login/", Scheme::Https)
            .is_some());
        assert!(table
            .match_route(&Method::GET, "/api/v1/auth/login/", Scheme::Http)
            .is_none());
    }

    #[test]
    fn test_unknown_path() {
        let table = table_v1();
        assert!(table
            .match_route(&Method::POST, "/api/v9/", Scheme::Http)
            .is_none());
    }
}
