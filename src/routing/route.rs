//! Route model and key/value parsing.
//!
//! # Responsibilities
//! - Describe a single routing rule (protocol, host, path, service, auth)
//! - Parse a raw configuration entry into a `Route`
//!
//! # Key Format
//! ```text
//! <prefix>/<protocol>/<host>/<segment>|<segment>|...
//! route/https/api.example.com/users|:id          →   /users/:id
//! config/routes/https/api.example.com/users|:id  →   /users/:id  (prefix "config/routes/")
//! ```
//!
//! # Design Decisions
//! - A `Route` is immutable once built; tables share it through `Arc`
//! - Value fields are optional, so `{}` is a valid (if useless) rule
//! - A bad entry is reported to the caller, never panics the build

use serde::Deserialize;
use thiserror::Error;

/// Separator between path segments inside a configuration key.
pub const KEY_SEGMENT_SEPARATOR: char = '|';

/// A single configured routing rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    protocol: String,
    host: String,
    path: String,
    service: String,
    auth: bool,
}

impl Route {
    /// Build a route, normalizing `path` so it always starts with `/`.
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        service: impl Into<String>,
        auth: bool,
    ) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };

        Self {
            protocol: protocol.into(),
            host: host.into(),
            path,
            service: service.into(),
            auth,
        }
    }

    /// Route used when a host matched but no path rule did.
    pub fn fallback(service: impl Into<String>) -> Self {
        Self::new("", "", "/", service, false)
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Logical service name, resolved to an address at request time.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Whether the rule requires authentication. Carried, not enforced.
    pub fn auth(&self) -> bool {
        self.auth
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}://{}{} -> {}{}",
            self.protocol,
            self.host,
            self.path,
            self.service,
            if self.auth { " (auth)" } else { "" }
        )
    }
}

/// Errors produced while parsing a single configuration entry.
#[derive(Debug, Error)]
pub enum RouteParseError {
    /// The key does not have the `<prefix>/<protocol>/<host>/<path>` shape.
    #[error("malformed route key {key:?}: {reason}")]
    Key { key: String, reason: &'static str },

    /// The value is not a valid route payload.
    #[error("malformed route value for {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Serialized payload stored under each route key.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RouteValue {
    service: String,
    auth: bool,
}

/// Parse a configuration entry listed under `prefix` into a `Route`.
///
/// The prefix may span several key components. Everything after the host is
/// treated as the pipe-separated path, so a path that happens to contain `/`
/// is kept intact.
pub fn parse_route(prefix: &str, key: &str, value: &[u8]) -> Result<Route, RouteParseError> {
    let rest = key.strip_prefix(prefix).ok_or_else(|| RouteParseError::Key {
        key: key.to_string(),
        reason: "key is outside the route prefix",
    })?;
    let rest = rest.strip_prefix('/').unwrap_or(rest);

    let mut parts = rest.splitn(3, '/');
    let (protocol, host, raw_path) = match (parts.next(), parts.next(), parts.next()) {
        (Some(protocol), Some(host), Some(path)) => (protocol, host, path),
        _ => {
            return Err(RouteParseError::Key {
                key: key.to_string(),
                reason: "expected <prefix>/<protocol>/<host>/<path>",
            })
        }
    };

    if protocol.is_empty() {
        return Err(RouteParseError::Key {
            key: key.to_string(),
            reason: "empty protocol",
        });
    }
    if host.is_empty() {
        return Err(RouteParseError::Key {
            key: key.to_string(),
            reason: "empty host",
        });
    }

    let data: RouteValue =
        serde_json::from_slice(value).map_err(|source| RouteParseError::Decode {
            key: key.to_string(),
            source,
        })?;

    let path = raw_path
        .split(KEY_SEGMENT_SEPARATOR)
        .collect::<Vec<_>>()
        .join("/");

    Ok(Route::new(
        protocol,
        host,
        format!("/{}", path),
        data.service,
        data.auth,
    ))
}
