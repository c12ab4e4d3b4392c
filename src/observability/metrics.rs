//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by outcome and status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_table_rebuilds_total` (counter): rebuild cycles by result
//! - `gateway_routes_loaded` (gauge): routes in the published table
//! - `gateway_route_parse_errors_total` (counter): skipped store entries
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed (tests, disabled)
//! - Labels are low-cardinality; no hosts or paths

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// How a proxied request was directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Matched a route (or the fallback service) and forwarded.
    Routed,
    /// Sent to the static fallback destination.
    Fallback,
    /// Service resolution failed.
    Unresolved,
    /// Forwarding to the upstream failed.
    UpstreamError,
}

impl RequestOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RequestOutcome::Routed => "routed",
            RequestOutcome::Fallback => "fallback",
            RequestOutcome::Unresolved => "unresolved",
            RequestOutcome::UpstreamError => "upstream_error",
        }
    }
}

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(outcome: RequestOutcome, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "outcome" => outcome.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "outcome" => outcome.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_table_rebuild(success: bool, routes: usize) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("gateway_table_rebuilds_total", "result" => result).increment(1);
    metrics::gauge!("gateway_routes_loaded").set(routes as f64);
}

pub fn record_route_parse_error() {
    metrics::counter!("gateway_route_parse_errors_total").increment(1);
}
