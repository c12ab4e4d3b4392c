//! Route table construction from the configuration store.
//!
//! # Responsibilities
//! - List every entry under the route prefix
//! - Parse entries into routes, skipping (and logging) bad ones
//! - Fill a fresh table and publish it in one atomic swap
//!
//! # Design Decisions
//! - A listing failure aborts the cycle; the published table stays put
//! - A single bad entry never aborts the cycle
//! - Rebuilds are serialized so publications happen in listing order

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RoutingConfig;
use crate::discovery::{BackendError, ConfigBackend, KvEntry};
use crate::observability::metrics;
use crate::routing::route::parse_route;
use crate::routing::table::RouteTable;
use crate::routing::trie::MatchPolicy;
use crate::routing::SharedRouteTable;

/// Errors that abort a rebuild cycle.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Listing the configuration store failed.
    #[error("configuration backend unavailable: {0}")]
    BackendUnavailable(#[source] BackendError),
}

/// Counters for a single build cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Entries returned by the store.
    pub listed: usize,
    /// Entries that parsed into routes.
    pub loaded: usize,
    /// Entries skipped as malformed.
    pub skipped: usize,
}

/// Builds route tables from raw store entries.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    prefix: String,
    policy: MatchPolicy,
}

impl TableBuilder {
    pub fn new(prefix: impl Into<String>, policy: MatchPolicy) -> Self {
        Self {
            prefix: prefix.into(),
            policy,
        }
    }

    pub fn from_config(config: &RoutingConfig) -> Self {
        Self::new(config.prefix.clone(), config.match_policy)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Build a table from already listed entries.
    pub fn build_from_entries(&self, entries: &[KvEntry]) -> (RouteTable, BuildReport) {
        let mut table = RouteTable::new(self.policy);
        let mut report = BuildReport {
            listed: entries.len(),
            ..BuildReport::default()
        };

        for entry in entries {
            // Folder markers some stores return for the prefix itself.
            if entry.key.ends_with('/') && entry.value.is_empty() {
                tracing::debug!(key = %entry.key, "Skipping folder entry");
                report.skipped += 1;
                continue;
            }

            match parse_route(&self.prefix, &entry.key, &entry.value) {
                Ok(route) => {
                    tracing::debug!(key = %entry.key, route = %route, "Route loaded");
                    table.insert(route);
                    report.loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(key = %entry.key, error = %e, "Skipping malformed route entry");
                    metrics::record_route_parse_error();
                    report.skipped += 1;
                }
            }
        }

        (table, report)
    }

    /// List the store and build a complete table. Nothing is published.
    pub async fn build(
        &self,
        backend: &dyn ConfigBackend,
    ) -> Result<(RouteTable, BuildReport), BuildError> {
        let entries = backend
            .list(&self.prefix)
            .await
            .map_err(BuildError::BackendUnavailable)?;
        Ok(self.build_from_entries(&entries))
    }
}

/// Rebuilds and publishes the shared table from a backend.
///
/// Startup, the refresh loop and the admin API all reload through here.
#[derive(Debug)]
pub struct Reloader {
    builder: TableBuilder,
    backend: Arc<dyn ConfigBackend>,
    table: Arc<SharedRouteTable>,
    lock: Mutex<()>,
}

impl Reloader {
    pub fn new(
        builder: TableBuilder,
        backend: Arc<dyn ConfigBackend>,
        table: Arc<SharedRouteTable>,
    ) -> Self {
        Self {
            builder,
            backend,
            table,
            lock: Mutex::new(()),
        }
    }

    pub fn table(&self) -> &Arc<SharedRouteTable> {
        &self.table
    }

    /// Run one build cycle and publish the result.
    ///
    /// On failure the previously published table stays in effect.
    pub async fn reload(&self) -> Result<BuildReport, BuildError> {
        let _guard = self.lock.lock().await;

        match self.builder.build(self.backend.as_ref()).await {
            Ok((table, report)) => {
                let published = self.table.publish(table);
                metrics::record_table_rebuild(true, published.route_count());
                tracing::info!(
                    version = published.version(),
                    routes = published.route_count(),
                    listed = report.listed,
                    skipped = report.skipped,
                    backend = self.backend.kind(),
                    "Route table published"
                );
                Ok(report)
            }
            Err(e) => {
                metrics::record_table_rebuild(false, self.table.snapshot().route_count());
                tracing::error!(
                    error = %e,
                    prefix = %self.builder.prefix(),
                    version = self.table.version(),
                    "Route table rebuild failed, keeping current table"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{ServiceAddress, StaticBackend};
    use async_trait::async_trait;

    #[derive(Debug)]
    struct DownBackend;

    #[async_trait]
    impl ConfigBackend for DownBackend {
        async fn list(&self, _prefix: &str) -> Result<Vec<KvEntry>, BackendError> {
            Err(BackendError::Unavailable("connection refused".into()))
        }

        async fn resolve_service(&self, name: &str) -> Result<ServiceAddress, BackendError> {
            Err(BackendError::NotFound(name.into()))
        }

        fn kind(&self) -> &'static str {
            "down"
        }
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let builder = TableBuilder::new("route/", MatchPolicy::InsertionOrder);
        let entries = vec![
            KvEntry::new("route/https/a.com/x", r#"{"service":"x"}"#),
            KvEntry::new("route/https/a.com/y", "not json"),
            KvEntry::new("route/https", "{}"),
            KvEntry::new("route/", ""),
            KvEntry::new("route/https/a.com/z|:id", r#"{"service":"z","auth":true}"#),
        ];

        let (table, report) = builder.build_from_entries(&entries);
        assert_eq!(
            report,
            BuildReport {
                listed: 5,
                loaded: 2,
                skipped: 3
            }
        );
        assert_eq!(table.route_count(), 2);

        let res = table.resolve("https", "a.com", "/z/9").unwrap();
        let route = res.route().unwrap();
        assert_eq!(route.service(), "z");
        assert!(route.auth());
        assert_eq!(res.params.get("id"), Some("9"));
    }

    #[test]
    fn test_multi_component_prefix() {
        let builder = TableBuilder::new("config/routes/", MatchPolicy::InsertionOrder);
        let entries = vec![
            KvEntry::new("config/routes/", ""),
            KvEntry::new("config/routes/https/api.test/users", r#"{"service":"users"}"#),
        ];

        let (table, report) = builder.build_from_entries(&entries);
        assert_eq!(
            report,
            BuildReport {
                listed: 2,
                loaded: 1,
                skipped: 1
            }
        );
        assert!(table.match_host("https", "api.test").is_some());
        assert!(table.match_host("routes", "https").is_none());

        let res = table.resolve("https", "api.test", "/users").unwrap();
        assert_eq!(res.route().unwrap().service(), "users");
    }

    #[tokio::test]
    async fn test_reload_publishes_new_table() {
        let backend = Arc::new(StaticBackend::new());
        backend.put("route/https/a.com/x", r#"{"service":"one"}"#);
        let shared = Arc::new(SharedRouteTable::new(MatchPolicy::InsertionOrder));
        let reloader = Reloader::new(
            TableBuilder::new("route/", MatchPolicy::InsertionOrder),
            backend.clone(),
            shared.clone(),
        );

        reloader.reload().await.unwrap();
        let first = shared.snapshot();
        assert_eq!(first.version(), 1);
        assert_eq!(first.route_count(), 1);

        backend.put("route/https/a.com/x", r#"{"service":"two"}"#);
        backend.put("route/https/a.com/y", r#"{"service":"y"}"#);
        reloader.reload().await.unwrap();

        let second = shared.snapshot();
        assert_eq!(second.version(), 2);
        assert_eq!(second.route_count(), 2);

        // The old snapshot is untouched.
        let res = first.resolve("https", "a.com", "/x").unwrap();
        assert_eq!(res.route().unwrap().service(), "one");
        let res = second.resolve("https", "a.com", "/x").unwrap();
        assert_eq!(res.route().unwrap().service(), "two");
    }

    #[tokio::test]
    async fn test_failed_listing_keeps_previous_table() {
        let shared = Arc::new(SharedRouteTable::new(MatchPolicy::InsertionOrder));
        let backend = StaticBackend::new();
        backend.put("route/https/a.com/x", r#"{"service":"one"}"#);
        let (table, _) = TableBuilder::new("route/", MatchPolicy::InsertionOrder)
            .build(&backend)
            .await
            .unwrap();
        shared.publish(table);

        let reloader = Reloader::new(
            TableBuilder::new("route/", MatchPolicy::InsertionOrder),
            Arc::new(DownBackend),
            shared.clone(),
        );
        let err = reloader.reload().await.unwrap_err();
        assert!(matches!(err, BuildError::BackendUnavailable(_)));

        let current = shared.snapshot();
        assert_eq!(current.version(), 1);
        assert_eq!(current.route_count(), 1);
    }
}
