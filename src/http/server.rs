//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Direct each request and forward it to the chosen upstream
//! - Map direction and upstream failures to 502

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TimeoutConfig;
use crate::http::director::{request_host, Destination, Director};
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, strip_hop_by_hop,
};
use crate::http::response::{gateway_error, relay};
use crate::observability::metrics::{self, RequestOutcome};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub director: Arc<Director>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server forwarding through `director`.
    pub fn new(director: Arc<Director>, timeouts: &TimeoutConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState { director, client };
        let router = Self::build_router(timeouts, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(timeouts: &TimeoutConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(timeouts.request_secs)))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Directs the request, rewrites its target and forwards it.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let (mut parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);
    let host = request_host(&parts);

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        host = ?host,
        uri = %parts.uri,
        "Directing request"
    );

    let directive = match state.director.direct(host.as_deref(), &parts.uri).await {
        Ok(directive) => directive,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Request direction failed");
            metrics::record_request(RequestOutcome::Unresolved, 502, start_time);
            return gateway_error(StatusCode::BAD_GATEWAY);
        }
    };

    let outcome = match directive.destination {
        Destination::Fallback => RequestOutcome::Fallback,
        Destination::Service { .. } => RequestOutcome::Routed,
    };

    if let Err(e) = directive.rewrite(&mut parts) {
        tracing::warn!(request_id = %request_id, error = %e, "Request rewrite failed");
        metrics::record_request(RequestOutcome::Unresolved, 502, start_time);
        return gateway_error(StatusCode::BAD_GATEWAY);
    }
    strip_hop_by_hop(&mut parts.headers);

    let upstream = parts.uri.clone();
    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                request_id = %request_id,
                upstream = %upstream,
                status = %status,
                "Upstream responded"
            );
            metrics::record_request(outcome, status.as_u16(), start_time);
            relay(response)
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, upstream = %upstream, error = %e, "Upstream error");
            metrics::record_request(RequestOutcome::UpstreamError, 502, start_time);
            gateway_error(StatusCode::BAD_GATEWAY)
        }
    }
}
