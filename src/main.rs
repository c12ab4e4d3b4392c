//! Boondock routing gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                    GATEWAY                       │
//!                      │                                                  │
//!  Client Request      │  ┌─────────┐   ┌──────────┐   ┌──────────────┐   │
//!  ────────────────────┼─▶│  http   │──▶│ director │──▶│   routing    │   │
//!                      │  │ server  │   │          │   │ host + trie  │   │
//!                      │  └─────────┘   └────┬─────┘   └──────▲───────┘   │
//!                      │                     │                │ publish   │
//!                      │                     ▼                │           │
//!                      │              ┌────────────┐   ┌──────┴───────┐   │
//!                      │              │ discovery  │◀──│   builder +  │   │
//!                      │              │  backend   │   │ refresh loop │   │
//!                      │              └─────┬──────┘   └──────────────┘   │
//!                      │                    │ service address             │
//!  Client Response     │  ┌─────────┐   ┌───▼──────┐                      │
//!  ◀───────────────────┼──│response │◀──│  client  │◀─────────────────────┼── Upstream
//!                      │  └─────────┘   └──────────┘                      │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use boondock::config::{load_config, GatewayConfig};
use boondock::lifecycle::{signals, Gateway, Shutdown};
use boondock::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "boondock")]
#[command(about = "Host and path routing gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file (defaults are used when omitted).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!("boondock v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        discovery = ?config.discovery.kind,
        prefix = %config.routing.prefix,
        refresh_interval_secs = config.routing.refresh_interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let gateway = Gateway::new(config)?;
    let shutdown = Shutdown::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    gateway.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
