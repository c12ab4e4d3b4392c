//! Path trie keyed by `/`-separated segments.
//!
//! # Segment Kinds
//! - Literal: `users` matches exactly `users`
//! - Named parameter: `:id` matches any single segment and binds it
//! - Suffix wildcard: `files*` matches any segment starting with `files`
//!   and ends the walk there, whatever follows
//!
//! # Design Decisions
//! - Children are kept in insertion order; the scan order is the tie-break
//! - First match wins, no backtracking when a deeper step fails
//! - `MatchPolicy::LiteralFirst` lets an exact literal outrank a param or
//!   wildcard sibling regardless of registration order
//! - A bare `*` has no prefix and is only ever a literal segment

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::routing::route::Route;

/// Sibling tie-break rule used for both insertion and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Scan siblings in registration order. A param sibling absorbs any
    /// later registration at the same depth.
    #[default]
    InsertionOrder,
    /// Exact literal siblings are tried before param and wildcard ones.
    LiteralFirst,
}

/// A single node in a host's path trie.
#[derive(Debug, Clone)]
pub struct TrieNode {
    segment: String,
    is_named_param: bool,
    children: Vec<TrieNode>,
    route: Option<Arc<Route>>,
}

/// Named parameters bound while resolving a path, in match order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    fn push(&mut self, name: &str, value: &str) {
        self.0.push((name.to_string(), value.to_string()));
    }

    /// First value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a resolution walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every incoming segment was consumed.
    Exhausted,
    /// A suffix wildcard node swallowed the rest of the path.
    CatchAll,
    /// No child matched the segment at `depth`.
    Unmatched { depth: usize },
}

/// Result of walking a trie for one request path.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub node: &'a TrieNode,
    pub params: Params,
    pub outcome: Outcome,
}

impl<'a> Resolution<'a> {
    /// The route for this walk, if it ended on a registered terminus.
    pub fn route(&self) -> Option<&'a Arc<Route>> {
        match self.outcome {
            Outcome::Exhausted | Outcome::CatchAll => self.node.route.as_ref(),
            Outcome::Unmatched { .. } => None,
        }
    }
}

enum Step<'a> {
    Descend(&'a TrieNode),
    CatchAll(&'a TrieNode),
}

/// Split a `/`-rooted path into the segments below the root.
///
/// The bare root `/` (or an empty path) yields no segments.
pub fn split_path(path: &str) -> Vec<&str> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        Vec::new()
    } else {
        trimmed.split('/').collect()
    }
}

impl TrieNode {
    /// Create the root node of a host trie.
    pub fn root() -> Self {
        Self::new("/")
    }

    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            is_named_param: segment.starts_with(':'),
            children: Vec::new(),
            route: None,
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn is_named_param(&self) -> bool {
        self.is_named_param
    }

    pub fn children(&self) -> &[TrieNode] {
        &self.children
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    fn param_name(&self) -> &str {
        &self.segment[1..]
    }

    /// Prefix of a suffix-wildcard segment (`files*` → `files`).
    fn wildcard_prefix(&self) -> Option<&str> {
        let prefix = self.segment.trim_end_matches('*');
        if prefix.len() < self.segment.len() && !prefix.is_empty() {
            Some(prefix)
        } else {
            None
        }
    }

    /// Register `route` under `path`.
    ///
    /// Re-registering a path replaces its route; the replaced one is returned.
    pub fn insert(
        &mut self,
        path: &str,
        route: Arc<Route>,
        policy: MatchPolicy,
    ) -> Option<Arc<Route>> {
        let mut node = self;
        for segment in split_path(path) {
            let existing = node.children.iter().position(|child| {
                child.segment == segment
                    || (policy == MatchPolicy::InsertionOrder && child.is_named_param)
            });
            let idx = match existing {
                Some(idx) => idx,
                None => {
                    node.children.push(TrieNode::new(segment));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx];
        }
        node.route.replace(route)
    }

    fn select_child(&self, segment: &str, policy: MatchPolicy) -> Option<Step<'_>> {
        if policy == MatchPolicy::LiteralFirst {
            if let Some(child) = self
                .children
                .iter()
                .find(|child| !child.is_named_param && child.segment == segment)
            {
                return Some(Step::Descend(child));
            }
        }

        for child in &self.children {
            if child.segment == segment || child.is_named_param {
                return Some(Step::Descend(child));
            }
            if let Some(prefix) = child.wildcard_prefix() {
                if segment.starts_with(prefix) {
                    return Some(Step::CatchAll(child));
                }
            }
        }
        None
    }

    /// Walk the trie along `segments`, binding named parameters.
    pub fn resolve(&self, segments: &[&str], policy: MatchPolicy) -> Resolution<'_> {
        let mut node = self;
        let mut params = Params::default();

        for (depth, segment) in segments.iter().enumerate() {
            match node.select_child(segment, policy) {
                Some(Step::Descend(child)) => {
                    if child.is_named_param {
                        params.push(child.param_name(), segment);
                    }
                    node = child;
                }
                Some(Step::CatchAll(child)) => {
                    return Resolution {
                        node: child,
                        params,
                        outcome: Outcome::CatchAll,
                    };
                }
                None => {
                    return Resolution {
                        node,
                        params,
                        outcome: Outcome::Unmatched { depth },
                    };
                }
            }
        }

        Resolution {
            node,
            params,
            outcome: Outcome::Exhausted,
        }
    }

    /// Convenience wrapper over [`TrieNode::resolve`] for a raw path.
    pub fn resolve_path(&self, path: &str, policy: MatchPolicy) -> Resolution<'_> {
        self.resolve(&split_path(path), policy)
    }

    /// Every route registered at or below this node, depth first.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        let mut out = Vec::new();
        self.collect_routes(&mut out);
        out
    }

    fn collect_routes(&self, out: &mut Vec<Arc<Route>>) {
        if let Some(route) = &self.route {
            out.push(route.clone());
        }
        for child in &self.children {
            child.collect_routes(out);
        }
    }
}
