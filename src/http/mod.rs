//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → request.rs (request ID, hop-by-hop headers)
//!     → director.rs (route table + service discovery → upstream target)
//!     → hyper-util client (forward, stream the body)
//!     → response.rs (relay, gateway errors)
//!     → Send to client
//! ```

pub mod director;
pub mod request;
pub mod response;
pub mod server;

pub use director::{DirectError, Destination, Directive, Director, DirectorSettings};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
