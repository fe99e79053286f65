//! Cron job request handlers.

use axum::{Json, extract::State};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::CRON_JOB_TAG;
use crate::api::dto::{
    CreateCronJobRequest, CronJobActionRequest, CronJobQuery, CronJobResponse, ErrorResponse,
    EventResponse, MessageResponse, TestCronJobRequest, UpdateCronJobRequest,
};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};

/// Creates cron job routes, nested under `/api/v1/cronJob`.
pub fn cron_job_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(create_cron_job))
        .routes(routes!(test_cron_job))
        .routes(routes!(enable_cron_job))
        .routes(routes!(disable_cron_job))
        .routes(routes!(update_cron_job))
        .routes(routes!(delete_cron_job))
        .routes(routes!(list_events))
}

/// POST /create - Register a job and start its trigger
#[utoipa::path(
    post,
    path = "/create",
    tag = CRON_JOB_TAG,
    request_body = CreateCronJobRequest,
    responses(
        (status = 200, description = "Cron job created and scheduled", body = CronJobResponse),
        (status = 400, description = "Invalid request or schedule", body = ErrorResponse),
        (status = 401, description = "Unknown user", body = ErrorResponse)
    )
)]
async fn create_cron_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCronJobRequest>,
) -> AppResult<Json<CronJobResponse>> {
    let (owner, request) = req.into_parts();
    let job = state.lifecycle.create(owner, request).await?;
    Ok(Json(CronJobResponse::from(job)))
}

/// POST /test - Probe a URL once without retries
#[utoipa::path(
    post,
    path = "/test",
    tag = CRON_JOB_TAG,
    request_body = TestCronJobRequest,
    responses(
        (status = 200, description = "Target answered", body = MessageResponse),
        (status = 400, description = "Invalid URL", body = ErrorResponse),
        (status = 500, description = "Probe failed; code is CORS_REJECTED, NO_RESPONSE or PROBE_FAILED", body = ErrorResponse)
    )
)]
async fn test_cron_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TestCronJobRequest>,
) -> AppResult<Json<MessageResponse>> {
    state.lifecycle.test_target(&req.url).await?;
    Ok(Json(MessageResponse::new("Target is reachable")))
}

/// POST /enable - Activate a job and reseed its upcoming events
#[utoipa::path(
    post,
    path = "/enable",
    tag = CRON_JOB_TAG,
    request_body = CronJobActionRequest,
    responses(
        (status = 200, description = "Cron job enabled", body = CronJobResponse),
        (status = 401, description = "Unknown user or foreign job", body = ErrorResponse),
        (status = 404, description = "Cron job not found", body = ErrorResponse)
    )
)]
async fn enable_cron_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CronJobActionRequest>,
) -> AppResult<Json<CronJobResponse>> {
    let job = state.lifecycle.enable(req.user_id, req.cron_job_id).await?;
    Ok(Json(CronJobResponse::from(job)))
}

/// POST /disable - Stop a job's trigger and drop its pending events
#[utoipa::path(
    post,
    path = "/disable",
    tag = CRON_JOB_TAG,
    request_body = CronJobActionRequest,
    responses(
        (status = 200, description = "Cron job disabled", body = CronJobResponse),
        (status = 401, description = "Unknown user or foreign job", body = ErrorResponse),
        (status = 404, description = "Cron job not found", body = ErrorResponse)
    )
)]
async fn disable_cron_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CronJobActionRequest>,
) -> AppResult<Json<CronJobResponse>> {
    let job = state.lifecycle.disable(req.user_id, req.cron_job_id).await?;
    Ok(Json(CronJobResponse::from(job)))
}

/// POST /update - Change title, url or schedule
#[utoipa::path(
    post,
    path = "/update",
    tag = CRON_JOB_TAG,
    request_body = UpdateCronJobRequest,
    responses(
        (status = 200, description = "Cron job updated", body = CronJobResponse),
        (status = 400, description = "No changes or invalid values", body = ErrorResponse),
        (status = 404, description = "Cron job not found", body = ErrorResponse)
    )
)]
async fn update_cron_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateCronJobRequest>,
) -> AppResult<Json<CronJobResponse>> {
    let job = state
        .lifecycle
        .update(req.user_id, req.cron_job_id, req.changes())
        .await?;
    Ok(Json(CronJobResponse::from(job)))
}

/// POST /delete - Remove a job with all its events
#[utoipa::path(
    post,
    path = "/delete",
    tag = CRON_JOB_TAG,
    params(CronJobQuery),
    responses(
        (status = 200, description = "Cron job deleted", body = MessageResponse),
        (status = 401, description = "Unknown user or foreign job", body = ErrorResponse),
        (status = 404, description = "Cron job not found", body = ErrorResponse)
    )
)]
async fn delete_cron_job(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<CronJobQuery>,
) -> AppResult<Json<MessageResponse>> {
    state
        .lifecycle
        .delete(query.user_id, query.cron_job_id)
        .await?;
    Ok(Json(MessageResponse::new("Cron job deleted")))
}

/// GET /events - A job's events, newest first
#[utoipa::path(
    get,
    path = "/events",
    tag = CRON_JOB_TAG,
    params(CronJobQuery),
    responses(
        (status = 200, description = "Event history", body = Vec<EventResponse>),
        (status = 401, description = "Unknown user or foreign job", body = ErrorResponse),
        (status = 404, description = "Cron job not found", body = ErrorResponse)
    )
)]
async fn list_events(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<CronJobQuery>,
) -> AppResult<Json<Vec<EventResponse>>> {
    let events = state
        .lifecycle
        .history(query.user_id, query.cron_job_id)
        .await?;
    Ok(Json(events.into_iter().map(EventResponse::from).collect()))
}
