//! System endpoints: health check and worker listing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{HealthResponse, WorkerListResponse};
use crate::app_state::AppState;

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, current timestamp and worker counts.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            workers_registered: state.registry.len(),
            workers_available: state.registry.available(),
        }),
    )
}

/// `GET /workers` — List registered workers.
#[utoipa::path(
    get,
    path = "/workers",
    tag = "System",
    summary = "List workers",
    description = "Returns every registered worker with its name, registration time and whether it is free or leased.",
    responses(
        (status = 200, description = "Registered workers", body = WorkerListResponse),
    )
)]
pub async fn list_workers(State(state): State<AppState>) -> impl IntoResponse {
    let workers = state.registry.workers();
    let available = state.registry.available();
    Json(WorkerListResponse {
        total: workers.len(),
        available,
        workers,
    })
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/workers", get(list_workers))
}
