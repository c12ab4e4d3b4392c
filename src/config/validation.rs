//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, schemes and required backend settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{DiscoveryKind, GatewayConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("{value:?} is not a valid socket address"),
        ));
    }
}

/// Outbound requests go through a plain `HttpConnector`; TLS is not supported.
fn check_scheme(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value != "http" {
        errors.push(ValidationError::new(
            field,
            format!("unsupported scheme {value:?}, only \"http\" is supported"),
        ));
    }
}

fn check_non_empty(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::new(field, "must not be empty"));
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);

    check_non_empty(&mut errors, "routing.prefix", &config.routing.prefix);
    check_non_empty(
        &mut errors,
        "routing.canonical_protocol",
        &config.routing.canonical_protocol,
    );
    check_scheme(&mut errors, "routing.upstream_scheme", &config.routing.upstream_scheme);
    if config.routing.retry_base_delay_ms > config.routing.retry_max_delay_ms {
        errors.push(ValidationError::new(
            "routing.retry_base_delay_ms",
            "must not exceed routing.retry_max_delay_ms",
        ));
    }

    check_scheme(&mut errors, "fallback.scheme", &config.fallback.scheme);
    check_non_empty(&mut errors, "fallback.host", &config.fallback.host);

    match config.discovery.kind {
        DiscoveryKind::Static => {}
        DiscoveryKind::File => {
            if config.discovery.path.as_deref().map_or(true, str::is_empty) {
                errors.push(ValidationError::new(
                    "discovery.path",
                    "required for the file backend",
                ));
            }
        }
        DiscoveryKind::Consul => {
            if Url::parse(&config.discovery.consul_address).is_err() {
                errors.push(ValidationError::new(
                    "discovery.consul_address",
                    format!("{:?} is not a valid URL", config.discovery.consul_address),
                ));
            }
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        check_non_empty(&mut errors, "admin.api_key", &config.admin.api_key);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "localhost".into();
        config.routing.upstream_scheme = "ftp".into();
        config.fallback.host = String::new();
        config.discovery.kind = DiscoveryKind::File;
        config.admin.enabled = true;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "listener.bind_address",
                "routing.upstream_scheme",
                "fallback.host",
                "discovery.path",
                "admin.api_key",
            ]
        );
    }

    #[test]
    fn test_outbound_schemes_must_be_http() {
        let mut config = GatewayConfig::default();
        config.routing.upstream_scheme = "https".into();
        config.fallback.scheme = "https".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["routing.upstream_scheme", "fallback.scheme"]);

        config.routing.upstream_scheme = "http".into();
        config.fallback.scheme = "http".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_consul_address_must_parse() {
        let mut config = GatewayConfig::default();
        config.discovery.kind = DiscoveryKind::Consul;
        config.discovery.consul_address = "::not a url".into();
        assert!(validate_config(&config).is_err());

        config.discovery.consul_address = "http://consul.service:8500".into();
        assert!(validate_config(&config).is_ok());
    }
}
