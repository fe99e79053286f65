//! Router configuration for the API.
//!
//! Central route registration and middleware stack.

use axum::{Router, middleware};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{global_error_handler, logging_middleware, request_id_middleware};
use crate::state::AppState;

const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Layers run outermost first (the last added wraps everything before it):
/// 1. CORS and compression
/// 2. Request ID - generates or propagates `x-request-id`
/// 3. Global error handler - normalises error bodies and stamps the request id
/// 4. Logging - one span per request
///
/// # Routes
/// - `/api/v1/cronJob/*` - cron job lifecycle and history
/// - `/api/health` - health check
/// - `/swagger-ui` - API docs, outside production only
pub fn create_router(state: AppState) -> Router {
    let (router, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/v1/cronJob", handlers::cron_jobs::cron_job_routes())
        .nest("/api", handlers::health::health_routes())
        .split_for_parts();

    let router = if state.settings.application.environment.exposes_api_docs() {
        router.merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, openapi))
    } else {
        router
    };

    router
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
