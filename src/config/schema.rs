//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::discovery::Catalog;
use crate::routing::MatchPolicy;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Route table and director settings.
    pub routing: RoutingConfig,

    /// Destination used when no host rule matches.
    pub fallback: FallbackConfig,

    /// Configuration store / service discovery backend.
    pub discovery: DiscoveryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Route table build and request direction settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Key prefix under which route entries live in the store.
    pub prefix: String,

    /// Protocol namespace used for every host lookup, whatever the
    /// inbound scheme.
    pub canonical_protocol: String,

    /// Service used when a host matched but no path rule did.
    pub fallback_service: String,

    /// Scheme used to reach resolved services.
    pub upstream_scheme: String,

    /// Sibling tie-break rule for the path trie.
    pub match_policy: MatchPolicy,

    /// Periodic rebuild interval in seconds (0 disables).
    pub refresh_interval_secs: u64,

    /// Base delay before retrying a failed rebuild, in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay between failed rebuild retries, in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            prefix: "route/".to_string(),
            canonical_protocol: "https".to_string(),
            fallback_service: "webapp".to_string(),
            upstream_scheme: "http".to_string(),
            match_policy: MatchPolicy::InsertionOrder,
            refresh_interval_secs: 30,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 10_000,
        }
    }
}

/// Static fallback destination.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub scheme: String,

    /// Authority (host or host:port) requests are sent to.
    pub host: String,

    /// Fixed query string merged into every outbound request.
    pub query: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "app.pipedrive.in".to_string(),
            query: String::new(),
        }
    }
}

/// Which discovery backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKind {
    /// Entries and services embedded in this config file.
    #[default]
    Static,
    /// A separate TOML catalog file, watched for changes.
    File,
    /// Consul KV store and health API.
    Consul,
}

/// Discovery backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub kind: DiscoveryKind,

    /// Catalog path for the `file` backend.
    pub path: Option<String>,

    /// Watch the catalog file and rebuild on change (`file` backend only).
    pub watch: bool,

    /// Consul HTTP API address.
    pub consul_address: String,

    /// Optional Consul ACL token.
    pub consul_token: Option<String>,

    /// Backend request timeout in seconds.
    pub timeout_secs: u64,

    /// Embedded catalog for the `static` backend.
    pub catalog: Catalog,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            kind: DiscoveryKind::Static,
            path: None,
            watch: true,
            consul_address: "http://127.0.0.1:8500".to_string(),
            consul_token: None,
            timeout_secs: 5,
            catalog: Catalog::default(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:3001".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
        assert_eq!(config.routing.prefix, "route/");
        assert_eq!(config.routing.canonical_protocol, "https");
        assert_eq!(config.routing.fallback_service, "webapp");
        assert_eq!(config.routing.match_policy, MatchPolicy::InsertionOrder);
        assert_eq!(config.discovery.kind, DiscoveryKind::Static);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [routing]
            match_policy = "literal_first"

            [discovery]
            kind = "consul"
            consul_address = "http://consul:8500"

            [fallback]
            host = "legacy.internal:8080"
            query = "src=gw"
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.match_policy, MatchPolicy::LiteralFirst);
        assert_eq!(config.routing.prefix, "route/");
        assert_eq!(config.discovery.kind, DiscoveryKind::Consul);
        assert_eq!(config.fallback.scheme, "http");
        assert_eq!(config.fallback.query, "src=gw");
    }
}
