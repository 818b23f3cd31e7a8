//! Radix tree nodes backing the route table.

use crate::method_map::MethodMap;
use crate::params::Params;

/// What a path segment matches.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SegmentKind {
    /// Matches the segment text exactly.
    Static,
    /// Matches any single segment, capturing it under the given name.
    Param(String),
}

/// A node in the route tree. One node per path segment; static children are
/// kept sorted so lookup is a binary search, and each node has at most one
/// parameter child.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    segment: String,
    kind: SegmentKind,
    map: Option<MethodMap>,
    static_children: Vec<Node>,
    param_child: Option<Box<Node>>,
}

impl Default for Node {
    fn default() -> Self {
        Self::root()
    }
}

impl Node {
    fn new_static(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Static,
            map: None,
            static_children: Vec::new(),
            param_child: None,
        }
    }

    fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segment: format!("{{{name}}}"),
            kind: SegmentKind::Param(name),
            map: None,
            static_children: Vec::new(),
            param_child: None,
        }
    }

    pub(crate) fn root() -> Self {
        Self::new_static("")
    }

    /// Inserts a path pattern. `{name}` segments capture; everything else
    /// matches literally. Empty segments (leading, trailing, doubled
    /// slashes) are ignored, which makes trailing slashes insignificant.
    pub(crate) fn insert(&mut self, path: &str, map: MethodMap) {
        let segments = Self::parse_path(path);
        self.insert_segments(&segments, map);
    }

    fn parse_path(path: &str) -> Vec<(String, SegmentKind)> {
        path.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    (s.to_string(), SegmentKind::Param(name.to_string()))
                } else {
                    (s.to_string(), SegmentKind::Static)
                }
            })
            .collect()
    }

    fn insert_segments(&mut self, segments: &[(String, SegmentKind)], map: MethodMap) {
        let Some((segment, kind)) = segments.first() else {
            match &mut self.map {
                Some(existing) => existing.merge(map),
                None => self.map = Some(map),
            }
            return;
        };
        let remaining = &segments[1..];

        match kind {
            SegmentKind::Static => {
                if let Some(child) = self
                    .static_children
                    .iter_mut()
                    .find(|c| c.segment == *segment)
                {
                    child.insert_segments(remaining, map);
                } else {
                    let mut child = Node::new_static(segment);
                    child.insert_segments(remaining, map);
                    self.static_children.push(child);
                    self.static_children
                        .sort_by(|a, b| a.segment.cmp(&b.segment));
                }
            }
            SegmentKind::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new_param(name.clone())));
                child.insert_segments(remaining, map);
            }
        }
    }

    /// Matches a concrete path, returning the method map at the matched
    /// node and any captured parameters. Static children take precedence
    /// over the parameter child.
    pub(crate) fn match_path(&self, path: &str) -> Option<(&MethodMap, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        self.match_segments(&segments, &mut params)
    }

    fn match_segments<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Params,
    ) -> Option<(&'a MethodMap, Params)> {
        let Some(segment) = segments.first() else {
            return self.map.as_ref().map(|m| (m, params.clone()));
        };
        let remaining = &segments[1..];

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                params.push(name.clone(), (*segment).to_string());
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Node> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}
