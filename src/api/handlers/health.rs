//! Health check endpoint handlers.
//!
//! Reports store reachability and the number of registered trigger handles.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::HEALTH_TAG;
use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

/// Creates health check routes.
pub fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(health_check))
}

/// GET /api/health - Service health
#[utoipa::path(
    get,
    path = "/health",
    tag = HEALTH_TAG,
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = BTreeMap::new();
    checks.insert("store".to_string(), check_store(&state).await);
    checks.insert("scheduler".to_string(), check_scheduler(&state));

    let response = HealthResponse::new(crate::pkg_version(), checks);
    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response))
}

async fn check_store(state: &AppState) -> ComponentHealth {
    let started = Instant::now();

    match state.store.ping().await {
        Ok(()) => ComponentHealth::healthy("Reachable").timed(started.elapsed()),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            ComponentHealth::unhealthy(format!("Store unreachable: {}", e)).timed(started.elapsed())
        }
    }
}

fn check_scheduler(state: &AppState) -> ComponentHealth {
    let handles = state.lifecycle.registry().len();
    ComponentHealth::healthy(format!("{} trigger handles registered", handles))
}
