//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to subsystems at startup
//!
//! Route catalog (file backend):
//!     watcher.rs detects change
//!     → rebuild trigger
//!     → routing::RefreshLoop rebuilds and publishes a new table
//! ```
//!
//! # Design Decisions
//! - Gateway config is immutable once loaded; routes are the dynamic part
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, DiscoveryConfig, DiscoveryKind, FallbackConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, RoutingConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::CatalogWatcher;
