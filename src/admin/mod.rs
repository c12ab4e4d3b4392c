//! Admin API: table inspection and on-demand reload.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::routing::Reloader;

#[derive(Clone)]
pub struct AdminState {
    pub reloader: Arc<Reloader>,
    pub api_key: Arc<str>,
}

impl AdminState {
    pub fn new(reloader: Arc<Reloader>, api_key: &str) -> Self {
        Self {
            reloader,
            api_key: Arc::from(api_key),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes))
        .route("/admin/reload", post(post_reload))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
