//! Route table: protocol → host → path trie.
//!
//! # Host Matching
//! - Exact host equality wins
//! - `*.example.com` matches any host ending in `.example.com`
//! - Among wildcards the longest suffix wins; ties keep registration order
//!
//! # Design Decisions
//! - Hosts and protocols are case-sensitive, compared as configured
//! - The request host is compared verbatim (a port is part of the host)
//! - A table is immutable once built; rebuilds produce a new one

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::route::Route;
use crate::routing::trie::{MatchPolicy, Resolution, TrieNode};

/// Trie roots registered for one protocol.
#[derive(Debug, Default, Clone)]
pub struct HostTable {
    exact: HashMap<String, TrieNode>,
    /// `(registered host, suffix, root)`, longest suffix first.
    wildcards: Vec<(String, String, TrieNode)>,
}

impl HostTable {
    fn root_mut(&mut self, host: &str) -> &mut TrieNode {
        match host.strip_prefix('*') {
            Some(suffix) => {
                let pos = match self.wildcards.iter().position(|(h, _, _)| h == host) {
                    Some(pos) => pos,
                    None => {
                        // Insert after every entry whose suffix is at least as long.
                        let pos = self
                            .wildcards
                            .iter()
                            .position(|(_, s, _)| s.len() < suffix.len())
                            .unwrap_or(self.wildcards.len());
                        self.wildcards.insert(
                            pos,
                            (host.to_string(), suffix.to_string(), TrieNode::root()),
                        );
                        pos
                    }
                };
                &mut self.wildcards[pos].2
            }
            None => self
                .exact
                .entry(host.to_string())
                .or_insert_with(TrieNode::root),
        }
    }

    /// Find the trie root for `host`.
    pub fn match_host(&self, host: &str) -> Option<&TrieNode> {
        if let Some(root) = self.exact.get(host) {
            return Some(root);
        }
        self.wildcards
            .iter()
            .find(|(_, suffix, _)| host.ends_with(suffix.as_str()))
            .map(|(_, _, root)| root)
    }

    /// Registered hosts, exact ones first.
    pub fn hosts(&self) -> impl Iterator<Item = (&str, &TrieNode)> {
        self.exact
            .iter()
            .map(|(h, n)| (h.as_str(), n))
            .chain(self.wildcards.iter().map(|(h, _, n)| (h.as_str(), n)))
    }
}

/// An immutable snapshot of every registered route.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    protocols: HashMap<String, HostTable>,
    policy: MatchPolicy,
    route_count: usize,
    version: u64,
}

impl RouteTable {
    /// Create an empty table that will insert and resolve with `policy`.
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Add a route, creating the protocol and host entries on first use.
    pub fn insert(&mut self, route: Route) {
        let route = Arc::new(route);
        let policy = self.policy;
        let root = self
            .protocols
            .entry(route.protocol().to_string())
            .or_default()
            .root_mut(route.host());
        if root.insert(route.path(), route.clone(), policy).is_none() {
            self.route_count += 1;
        }
    }

    /// Find the trie root registered for `host` under `protocol`.
    pub fn match_host(&self, protocol: &str, host: &str) -> Option<&TrieNode> {
        self.protocols.get(protocol)?.match_host(host)
    }

    /// Match host then walk the path trie.
    pub fn resolve(&self, protocol: &str, host: &str, path: &str) -> Option<Resolution<'_>> {
        self.match_host(protocol, host)
            .map(|root| root.resolve_path(path, self.policy))
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Number of distinct registered paths.
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Publication sequence number assigned by [`SharedRouteTable`].
    ///
    /// [`SharedRouteTable`]: crate::routing::SharedRouteTable
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// All routes, grouped by protocol and host.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        let mut out = Vec::with_capacity(self.route_count);
        for hosts in self.protocols.values() {
            for (_, root) in hosts.hosts() {
                out.extend(root.routes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(routes: &[(&str, &str, &str, &str)]) -> RouteTable {
        let mut table = RouteTable::new(MatchPolicy::InsertionOrder);
        for (protocol, host, path, service) in routes {
            table.insert(Route::new(*protocol, *host, *path, *service, false));
        }
        table
    }

    #[test]
    fn test_exact_host() {
        let table = table(&[("https", "api.example.com", "/x", "api")]);

        assert!(table.match_host("https", "api.example.com").is_some());
        assert!(table.match_host("https", "API.example.com").is_none());
        assert!(table.match_host("http", "api.example.com").is_none());
    }

    #[test]
    fn test_wildcard_host() {
        let table = table(&[("https", "*.example.com", "/x", "wild")]);

        let res = table.resolve("https", "api.example.com", "/x").unwrap();
        assert_eq!(res.route().unwrap().service(), "wild");

        assert!(table.resolve("https", "other.org", "/x").is_none());
        assert!(table.match_host("https", "example.com").is_none());
    }

    #[test]
    fn test_exact_beats_wildcard() {
        let table = table(&[
            ("https", "*.example.com", "/x", "wild"),
            ("https", "api.example.com", "/x", "exact"),
        ]);

        let res = table.resolve("https", "api.example.com", "/x").unwrap();
        assert_eq!(res.route().unwrap().service(), "exact");

        let res = table.resolve("https", "www.example.com", "/x").unwrap();
        assert_eq!(res.route().unwrap().service(), "wild");
    }

    #[test]
    fn test_longest_wildcard_suffix_wins() {
        let table = table(&[
            ("https", "*", "/x", "any"),
            ("https", "*.example.com", "/x", "example"),
            ("https", "*.eu.example.com", "/x", "eu"),
        ]);

        let eu = table.resolve("https", "api.eu.example.com", "/x").unwrap();
        assert_eq!(eu.route().unwrap().service(), "eu");

        let ex = table.resolve("https", "api.example.com", "/x").unwrap();
        assert_eq!(ex.route().unwrap().service(), "example");

        let any = table.resolve("https", "other.org", "/x").unwrap();
        assert_eq!(any.route().unwrap().service(), "any");
    }

    #[test]
    fn test_route_count() {
        let table = table(&[
            ("https", "a.com", "/x", "1"),
            ("https", "a.com", "/x", "2"),
            ("https", "a.com", "/y", "3"),
            ("http", "a.com", "/x", "4"),
        ]);
        assert_eq!(table.route_count(), 3);
        assert_eq!(table.routes().len(), 3);
        assert!(RouteTable::default().is_empty());
    }
}
