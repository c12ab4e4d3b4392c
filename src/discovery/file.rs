//! File-backed configuration store.
//!
//! The catalog file is re-read on every call so that edits are picked up by
//! the next rebuild without restarting. Pair it with
//! `config::watcher::CatalogWatcher` to rebuild as soon as the file changes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::discovery::{BackendError, Catalog, ConfigBackend, KvEntry, ServiceAddress};

#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Catalog, BackendError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            BackendError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| BackendError::Decode(format!("{}: {}", self.path.display(), e)))
    }
}

#[async_trait]
impl ConfigBackend for FileBackend {
    async fn list(&self, prefix: &str) -> Result<Vec<KvEntry>, BackendError> {
        Ok(self.load().await?.list(prefix))
    }

    async fn resolve_service(&self, name: &str) -> Result<ServiceAddress, BackendError> {
        self.load().await?.resolve(name)
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
