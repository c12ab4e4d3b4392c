use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::routing::BuildReport;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub table_version: u64,
    pub routes: usize,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub protocol: String,
    pub host: String,
    pub path: String,
    pub service: String,
    pub auth: bool,
}

#[derive(Serialize)]
pub struct ReloadStatus {
    pub table_version: u64,
    #[serde(flatten)]
    pub report: BuildReport,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let table = state.reloader.table().snapshot();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        table_version: table.version(),
        routes: table.route_count(),
    })
}

pub async fn get_routes(State(state): State<AdminState>) -> Json<Vec<RouteStatus>> {
    let table = state.reloader.table().snapshot();
    let routes = table
        .routes()
        .into_iter()
        .map(|r| RouteStatus {
            protocol: r.protocol().to_string(),
            host: r.host().to_string(),
            path: r.path().to_string(),
            service: r.service().to_string(),
            auth: r.auth(),
        })
        .collect();
    Json(routes)
}

pub async fn post_reload(
    State(state): State<AdminState>,
) -> Result<Json<ReloadStatus>, (StatusCode, Json<serde_json::Value>)> {
    match state.reloader.reload().await {
        Ok(report) => Ok(Json(ReloadStatus {
            table_version: state.reloader.table().version(),
            report,
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "error": e.to_string(),
                "table_version": state.reloader.table().version(),
            })),
        )),
    }
}
