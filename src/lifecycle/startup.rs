//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the discovery backend and the shared route table
//! - Run the initial table build before traffic is accepted
//! - Start background tasks (refresh loop, catalog watcher, SIGHUP, admin)
//! - Serve proxy traffic until shutdown, then wait for the tasks to stop
//!
//! # Design Decisions
//! - A failed initial build is not fatal: the gateway serves with an empty
//!   table (every request goes to the fallback destination) and retries
//! - Listeners start last

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use notify::RecommendedWatcher;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{CatalogWatcher, DiscoveryKind, GatewayConfig};
use crate::discovery::{self, BackendError, ConfigBackend};
use crate::http::{Director, DirectorSettings, HttpServer};
use crate::lifecycle::{signals, Shutdown};
use crate::routing::{RefreshLoop, Reloader, SharedRouteTable, TableBuilder};

/// Errors that stop the gateway from starting or serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize discovery backend: {0}")]
    Backend(#[from] BackendError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// A fully wired gateway, ready to serve.
pub struct Gateway {
    config: GatewayConfig,
    table: Arc<SharedRouteTable>,
    reloader: Arc<Reloader>,
    director: Arc<Director>,
    trigger: Arc<Notify>,
}

impl Gateway {
    /// Wire the gateway using the discovery backend named in `config`.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let backend = discovery::from_config(&config.discovery)?;
        Ok(Self::with_backend(config, backend))
    }

    /// Wire the gateway around an existing backend.
    pub fn with_backend(config: GatewayConfig, backend: Arc<dyn ConfigBackend>) -> Self {
        let table = Arc::new(SharedRouteTable::new(config.routing.match_policy));
        let reloader = Arc::new(Reloader::new(
            TableBuilder::from_config(&config.routing),
            backend.clone(),
            table.clone(),
        ));
        let director = Arc::new(Director::new(
            table.clone(),
            backend,
            DirectorSettings::from_config(&config.routing, &config.fallback),
        ));

        Self {
            config,
            table,
            reloader,
            director,
            trigger: Arc::new(Notify::new()),
        }
    }

    pub fn table(&self) -> &Arc<SharedRouteTable> {
        &self.table
    }

    pub fn reloader(&self) -> &Arc<Reloader> {
        &self.reloader
    }

    /// Notifying this requests an out-of-band rebuild.
    pub fn trigger(&self) -> &Arc<Notify> {
        &self.trigger
    }

    /// Run until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), StartupError> {
        if self.reloader.reload().await.is_err() {
            tracing::warn!("Initial route build failed, serving fallback until a rebuild succeeds");
            self.trigger.notify_one();
        }

        let interval = match self.config.routing.refresh_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let refresh = RefreshLoop::new(self.reloader.clone(), interval, self.trigger.clone())
            .with_retry_backoff(
                self.config.routing.retry_base_delay_ms,
                self.config.routing.retry_max_delay_ms,
            );
        let refresh_task = tokio::spawn(refresh.run(shutdown.subscribe()));

        let _watcher = self.start_watcher();
        signals::spawn_reload_on_hangup(self.trigger.clone(), shutdown.subscribe());

        let admin_task = if self.config.admin.enabled {
            let address = self.config.admin.bind_address.clone();
            let admin_listener = TcpListener::bind(&address)
                .await
                .map_err(|source| StartupError::Bind { address, source })?;
            let router = setup_admin_router(AdminState::new(
                self.reloader.clone(),
                &self.config.admin.api_key,
            ));
            let mut admin_shutdown = shutdown.subscribe();

            tracing::info!(address = %self.config.admin.bind_address, "Admin API starting");
            Some(tokio::spawn(async move {
                let served = axum::serve(admin_listener, router)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = served {
                    tracing::error!(error = %e, "Admin API failed");
                }
            }))
        } else {
            None
        };

        let server = HttpServer::new(self.director.clone(), &self.config.timeouts);
        server
            .run(listener, shutdown.subscribe())
            .await
            .map_err(StartupError::Serve)?;

        let _ = refresh_task.await;
        if let Some(task) = admin_task {
            let _ = task.await;
        }
        Ok(())
    }

    /// Watch the catalog file when the file backend asks for it.
    fn start_watcher(&self) -> Option<RecommendedWatcher> {
        let discovery = &self.config.discovery;
        if discovery.kind != DiscoveryKind::File || !discovery.watch {
            return None;
        }
        let path = discovery.path.as_deref()?;

        match CatalogWatcher::new(Path::new(path), self.trigger.clone()).run() {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!(path, error = %e, "Catalog watcher unavailable, relying on periodic refresh");
                None
            }
        }
    }
}
