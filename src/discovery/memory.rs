//! In-memory configuration backend.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::discovery::{BackendError, Catalog, ConfigBackend, KvEntry, ServiceAddress};

/// A thread-safe in-memory key/value store and service registry.
///
/// Seeded from the `[discovery.catalog]` config section and mutable at
/// runtime, which makes it the natural backend for tests and local setups.
#[derive(Debug, Default)]
pub struct StaticBackend {
    entries: DashMap<String, Vec<u8>>,
    services: DashMap<String, ServiceAddress>,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_catalog(catalog: &Catalog) -> Self {
        let backend = Self::new();
        for entry in &catalog.entries {
            backend.put(entry.key.clone(), entry.value.as_bytes());
        }
        for (name, addr) in &catalog.services {
            backend.register_service(name.clone(), addr.clone());
        }
        backend
    }

    /// Store (or replace) a raw entry.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn register_service(&self, name: impl Into<String>, addr: ServiceAddress) {
        self.services.insert(name.into(), addr);
    }

    pub fn deregister_service(&self, name: &str) -> bool {
        self.services.remove(name).is_some()
    }
}

#[async_trait]
impl ConfigBackend for StaticBackend {
    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>, BackendError> {
        let mut entries: Vec<KvEntry> = self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| KvEntry::new(e.key().clone(), e.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    async fn resolve_service(&self, name: &str) -> Result<ServiceAddress, BackendError> {
        self.services
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| BackendError::NotFound(name.to_string()))
    }

    fn kind(&self) -> &'static str {
        "static"
    }
}
