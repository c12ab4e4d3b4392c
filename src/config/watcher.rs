//! Catalog file watcher for hot route reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::Notify;

/// A watcher that requests a route table rebuild when the catalog changes.
pub struct CatalogWatcher {
    path: PathBuf,
    trigger: Arc<Notify>,
}

impl CatalogWatcher {
    /// Create a watcher that pokes `trigger` on every change to `path`.
    pub fn new(path: &Path, trigger: Arc<Notify>) -> Self {
        Self {
            path: path.to_path_buf(),
            trigger,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as events are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let trigger = self.trigger.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Catalog change detected, requesting rebuild");
                        trigger.notify_one();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Catalog watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_change_triggers_rebuild() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let trigger = Arc::new(Notify::new());

        let _watcher = CatalogWatcher::new(file.path(), trigger.clone())
            .run()
            .unwrap();

        std::fs::write(file.path(), "[[entries]]\nkey = \"route/https/a/b\"\nvalue = \"{}\"\n")
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), trigger.notified())
            .await
            .expect("watcher should request a rebuild");
    }

    #[test]
    fn test_missing_file_fails() {
        let trigger = Arc::new(Notify::new());
        let result = CatalogWatcher::new(Path::new("/nonexistent/catalog.toml"), trigger).run();
        assert!(result.is_err());
    }
}
