//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (startup, refresh tick, catalog change, admin reload):
//!     ConfigBackend::list(prefix)
//!     → route.rs (parse key/value into Route)
//!     → table.rs (protocol → host → trie.rs root)
//!     → SharedRouteTable::publish (atomic swap)
//!
//! Incoming Request (host, path):
//!     → SharedRouteTable::snapshot (once per request)
//!     → table.rs (host match: exact, then wildcard)
//!     → trie.rs (path walk, named params, suffix wildcards)
//!     → Return: matched Route or no-match
//! ```
//!
//! # Design Decisions
//! - Tables are immutable after construction (lock-free reads)
//! - Readers hold an `Arc` snapshot for the whole request
//! - Deterministic: same table and input always match the same route
//! - First match wins (ordered by registration or `MatchPolicy`)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

pub mod builder;
pub mod refresh;
pub mod route;
pub mod table;
pub mod trie;

pub use builder::{BuildError, BuildReport, Reloader, TableBuilder};
pub use refresh::RefreshLoop;
pub use route::{parse_route, Route, RouteParseError};
pub use table::{HostTable, RouteTable};
pub use trie::{MatchPolicy, Outcome, Params, Resolution, TrieNode};

/// The currently published route table.
///
/// Readers call [`snapshot`](Self::snapshot) once and keep the `Arc` for the
/// whole request, so a concurrent publish can never be observed half-way.
#[derive(Debug)]
pub struct SharedRouteTable {
    current: ArcSwap<RouteTable>,
    last_version: AtomicU64,
    publish_lock: Mutex<()>,
}

impl SharedRouteTable {
    /// Start with an empty table (version 0).
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            current: ArcSwap::from_pointee(RouteTable::new(policy)),
            last_version: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
        }
    }

    /// The table visible to requests starting now.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Stamp `table` with the next version and make it current.
    pub fn publish(&self, mut table: RouteTable) -> Arc<RouteTable> {
        let _guard = self
            .publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let version = self.last_version.fetch_add(1, Ordering::Relaxed) + 1;
        table.set_version(version);

        let table = Arc::new(table);
        self.current.store(table.clone());
        table
    }

    /// Version of the current table.
    pub fn version(&self) -> u64 {
        self.current.load().version()
    }
}
