use crate::{db, handlers::common::success_response, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Serialize;

/// Router for health probes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

/// Liveness + database reachability probe.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses((status = 200, description = "Service health")),
    tag = "Health"
)]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match db::check_connection(&state.db).await {
        Ok(()) => "up",
        Err(_) => "down",
    };
    success_response(HealthResponse {
        status: "ok",
        database,
    })
}
