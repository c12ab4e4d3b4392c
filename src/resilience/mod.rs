//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Route table rebuild fails (store unreachable):
//!     → previous table stays published
//!     → backoff.rs (delay before the next attempt)
//!     → routing::RefreshLoop retries
//!
//! Request to upstream:
//!     → request timeout (tower_http TimeoutLayer)
//!     → connect timeout (hyper-util HttpConnector)
//!     → failure → 502 Bad Gateway
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Jittered backoff prevents a fleet of gateways hammering the store
//! - Requests are never retried by the gateway (no idempotency knowledge)

pub mod backoff;
