//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay upstream responses without buffering
//! - Map gateway failures to fixed, short error responses
//!
//! # Design Decisions
//! - Internal error details go to the log, never to the client
//! - Hop-by-hop headers from the upstream are stripped

use axum::{
    body::{Body, Bytes, HttpBody},
    http::{Response as HttpResponse, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::request::strip_hop_by_hop;

/// A gateway-generated error response.
pub fn gateway_error(status: StatusCode) -> Response {
    let message = match status {
        StatusCode::BAD_GATEWAY => "Bad Gateway",
        StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
        StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
        _ => "Gateway Error",
    };
    (status, message).into_response()
}

/// Convert an upstream response into one we can hand back to the client.
pub fn relay<B>(upstream: HttpResponse<B>) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<axum::BoxError>,
{
    let (mut parts, body) = upstream.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
