//! Configuration store and service discovery.
//!
//! # Data Flow
//! ```text
//! Route table rebuild:
//!     ConfigBackend::list("route/")
//!     → Vec<KvEntry> ordered by key
//!     → routing::builder parses each entry
//!
//! Per request:
//!     ConfigBackend::resolve_service("users-api")
//!     → ServiceAddress (host:port) or NotFound
//! ```
//!
//! # Backends
//! - `static`: in-memory catalog, seeded from config, mutable at runtime
//! - `file`: TOML catalog re-read on every call
//! - `consul`: Consul KV + health API over HTTP
//!
//! # Design Decisions
//! - One trait for both concerns, the gateway never cares where keys live
//! - Backends are shared as `Arc<dyn ConfigBackend>` across requests
//! - Listing order is by key so rebuilds are deterministic

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::schema::{DiscoveryConfig, DiscoveryKind};

pub mod consul;
pub mod file;
pub mod memory;

pub use consul::ConsulBackend;
pub use file::FileBackend;
pub use memory::StaticBackend;

/// A raw key/value entry from the configuration store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl KvEntry {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Network address of a resolved service instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceAddress {
    pub address: String,
    pub port: u16,
}

impl ServiceAddress {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }
}

impl std::fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.address.contains(':') && !self.address.starts_with('[') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Errors returned by configuration backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The store could not be reached or answered with an error.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// No (healthy) instance is registered for the service.
    #[error("service not found: {0}")]
    NotFound(String),

    /// The store answered with a payload we could not decode.
    #[error("backend payload decode failed: {0}")]
    Decode(String),
}

/// Source of routing rules and service addresses.
#[async_trait]
pub trait ConfigBackend: Send + Sync + std::fmt::Debug {
    /// All entries whose key starts with `prefix`, ordered by key.
    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>, BackendError>;

    /// Resolve a logical service name to an instance address.
    async fn resolve_service(&self, name: &str) -> Result<ServiceAddress, BackendError>;

    /// Short backend name for logs.
    fn kind(&self) -> &'static str;
}

/// One raw entry of a serialized catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CatalogEntry {
    pub key: String,
    /// Raw value bytes, conventionally a JSON route payload.
    pub value: String,
}

/// Serialized catalog shared by the static and file backends.
///
/// ```toml
/// [[entries]]
/// key = "route/https/api.example.com/users|:id"
/// value = '{"service": "users", "auth": true}'
///
/// [services.users]
/// address = "10.0.0.12"
/// port = 8080
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Catalog {
    pub entries: Vec<CatalogEntry>,
    pub services: BTreeMap<String, ServiceAddress>,
}

impl Catalog {
    /// Entries under `prefix`, ordered by key.
    pub fn list(&self, prefix: &str) -> Vec<KvEntry> {
        let mut entries: Vec<KvEntry> = self
            .entries
            .iter()
            .filter(|e| e.key.starts_with(prefix))
            .map(|e| KvEntry::new(e.key.clone(), e.value.as_bytes()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    pub fn resolve(&self, name: &str) -> Result<ServiceAddress, BackendError> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }
}

/// Build the backend selected in configuration.
pub fn from_config(config: &DiscoveryConfig) -> Result<Arc<dyn ConfigBackend>, BackendError> {
    let backend: Arc<dyn ConfigBackend> = match config.kind {
        DiscoveryKind::Static => Arc::new(StaticBackend::from_catalog(&config.catalog)),
        DiscoveryKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                BackendError::Unavailable("file discovery requires a path".to_string())
            })?;
            Arc::new(FileBackend::new(path))
        }
        DiscoveryKind::Consul => Arc::new(ConsulBackend::new(
            &config.consul_address,
            config.consul_token.clone(),
            std::time::Duration::from_secs(config.timeout_secs),
        )?),
    };

    tracing::info!(kind = backend.kind(), "Discovery backend initialized");
    Ok(backend)
}
