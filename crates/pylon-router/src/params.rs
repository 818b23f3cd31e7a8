//! Path parameters extracted by a route match.

use smallvec::SmallVec;

// Dispatch paths carry at most `service` and `action`; four inline slots
// cover any realistic custom route without touching the heap.
const INLINE_PARAMS: usize = 4;

/// Named path segments captured while matching a route.
///
/// # Example
///
/// ```
/// use pylon_router::Params;
///
/// let mut params = Params::new();
/// params.push("service", "auth");
/// params.push("action", "login");
/// assert_eq!(params.get("service"), Some("auth"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured segment.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of captured segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the captured pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_get() {
        let mut params = Params::new();
        params.push("service", "orders");
        assert_eq!(params.get("service"), Some("orders"));
        assert_eq!(params.len(), 1);
        assert!(!params.is_empty());
    }

    #[test]
    fn test_iter_order() {
        let mut params = Params::new();
        params.push("a", "1");
        params.push("b", "2");
        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    }
}
