//! Request direction: pick the upstream for an inbound request.
//!
//! # Flow
//! ```text
//! snapshot table (once)
//!     → match host under the canonical protocol
//!         miss, or path is "/" → static fallback destination
//!     → walk the host's path trie
//!         no route → synthesized route to the fallback service
//!     → drop the snapshot
//!     → resolve service name → address (502 on failure)
//!     → Directive (scheme, authority, path + merged query, original host)
//! ```
//!
//! # Design Decisions
//! - Host lookups always use the canonical protocol, not the inbound scheme;
//!   route keys live in one namespace used purely for matching
//! - No-match is not an error; only resolution failures surface to clients
//! - The table snapshot is released before any await point

use std::sync::Arc;

use axum::http::{header, request::Parts, uri::Uri, HeaderValue, Version};
use thiserror::Error;

use crate::config::{FallbackConfig, RoutingConfig};
use crate::discovery::{BackendError, ConfigBackend, ServiceAddress};
use crate::routing::{Params, Route, SharedRouteTable};

/// Header carrying the original virtual host to the upstream.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Errors that prevent a request from being forwarded.
#[derive(Debug, Error)]
pub enum DirectError {
    /// The matched route's service has no reachable instance.
    #[error("cannot resolve service {service:?} for route {route}: {source}")]
    ServiceResolution {
        service: String,
        route: String,
        #[source]
        source: BackendError,
    },

    /// The rewritten target is not a valid URI.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

/// Static settings for the director, taken from configuration.
#[derive(Debug, Clone)]
pub struct DirectorSettings {
    pub canonical_protocol: String,
    pub fallback_service: String,
    pub upstream_scheme: String,
    pub fallback_scheme: String,
    pub fallback_host: String,
    /// Fixed query merged into every outbound request.
    pub default_query: String,
}

impl DirectorSettings {
    pub fn from_config(routing: &RoutingConfig, fallback: &FallbackConfig) -> Self {
        Self {
            canonical_protocol: routing.canonical_protocol.clone(),
            fallback_service: routing.fallback_service.clone(),
            upstream_scheme: routing.upstream_scheme.clone(),
            fallback_scheme: fallback.scheme.clone(),
            fallback_host: fallback.host.clone(),
            default_query: fallback.query.clone(),
        }
    }
}

/// Where a request ended up.
#[derive(Debug, Clone)]
pub enum Destination {
    /// The static fallback destination (no host match, or bare `/`).
    Fallback,
    /// A resolved service instance.
    Service {
        route: Arc<Route>,
        params: Params,
        address: ServiceAddress,
        /// True when no path rule matched and the fallback service was used.
        synthesized: bool,
    },
}

/// The outbound rewrite for one request.
#[derive(Debug, Clone)]
pub struct Directive {
    pub scheme: String,
    pub authority: String,
    pub path_and_query: String,
    /// Host the client originally asked for.
    pub original_host: Option<String>,
    pub destination: Destination,
}

impl Directive {
    /// Absolute upstream URI.
    pub fn uri(&self) -> Result<Uri, DirectError> {
        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(self.path_and_query.as_str())
            .build()
            .map_err(|e| DirectError::InvalidTarget(e.to_string()))
    }

    /// Point the request at the upstream, keeping the original virtual host.
    pub fn rewrite(&self, parts: &mut Parts) -> Result<(), DirectError> {
        parts.uri = self.uri()?;
        parts.version = Version::HTTP_11;

        if let Some(host) = &self.original_host {
            let value = HeaderValue::from_str(host)
                .map_err(|e| DirectError::InvalidTarget(e.to_string()))?;
            parts.headers.insert(header::HOST, value.clone());
            parts.headers.insert(X_FORWARDED_HOST, value);
        }
        Ok(())
    }
}

/// Join the fixed query and the inbound query with `&` when both are set.
pub fn merge_query(default_query: &str, inbound: &str) -> String {
    if default_query.is_empty() || inbound.is_empty() {
        format!("{default_query}{inbound}")
    } else {
        format!("{default_query}&{inbound}")
    }
}

/// Host the client asked for: the `Host` header, else the URI authority.
pub fn request_host(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| parts.uri.authority().map(|a| a.to_string()))
}

/// Resolves inbound requests against the published route table.
#[derive(Debug)]
pub struct Director {
    table: Arc<SharedRouteTable>,
    backend: Arc<dyn ConfigBackend>,
    settings: DirectorSettings,
}

impl Director {
    pub fn new(
        table: Arc<SharedRouteTable>,
        backend: Arc<dyn ConfigBackend>,
        settings: DirectorSettings,
    ) -> Self {
        Self {
            table,
            backend,
            settings,
        }
    }

    pub fn settings(&self) -> &DirectorSettings {
        &self.settings
    }

    /// Decide where a request for `host` + `uri` goes.
    pub async fn direct(&self, host: Option<&str>, uri: &Uri) -> Result<Directive, DirectError> {
        let path = uri.path();
        let query = merge_query(&self.settings.default_query, uri.query().unwrap_or(""));
        let path_and_query = if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        };

        let matched = {
            let table = self.table.snapshot();
            let root = host.and_then(|h| table.match_host(&self.settings.canonical_protocol, h));
            match root {
                Some(root) if path != "/" => {
                    let resolution = root.resolve_path(path, table.policy());
                    Some((resolution.route().cloned(), resolution.params))
                }
                _ => None,
            }
        };

        let (route, params) = match matched {
            Some(found) => found,
            None => {
                tracing::debug!(host = ?host, path = %path, "No host rule, using fallback destination");
                return Ok(Directive {
                    scheme: self.settings.fallback_scheme.clone(),
                    authority: self.settings.fallback_host.clone(),
                    path_and_query,
                    original_host: host.map(str::to_string),
                    destination: Destination::Fallback,
                });
            }
        };

        let synthesized = route.is_none();
        let route =
            route.unwrap_or_else(|| Arc::new(Route::fallback(self.settings.fallback_service.clone())));

        let address = self
            .backend
            .resolve_service(route.service())
            .await
            .and_then(|address| {
                if address.address.is_empty() {
                    Err(BackendError::NotFound(format!(
                        "{} resolved to an empty address",
                        route.service()
                    )))
                } else {
                    Ok(address)
                }
            })
            .map_err(|source| DirectError::ServiceResolution {
                service: route.service().to_string(),
                route: route.path().to_string(),
                source,
            })?;

        tracing::debug!(
            route = %route,
            synthesized,
            address = %address,
            params = ?params,
            auth = route.auth(),
            "Route resolved"
        );

        Ok(Directive {
            scheme: self.settings.upstream_scheme.clone(),
            authority: address.to_string(),
            path_and_query,
            original_host: host.map(str::to_string),
            destination: Destination::Service {
                route,
                params,
                address,
                synthesized,
            },
        })
    }
}
