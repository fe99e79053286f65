use utoipa::OpenApi;

pub const CRON_JOB_TAG: &str = "CronJob";
pub const HEALTH_TAG: &str = "Health";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Cronhook",
        description = "Schedules recurring HTTP calls to user-supplied URLs",
    ),
    components(
        schemas(
            crate::api::dto::ErrorResponse,
            crate::models::EventStatus,
        )
    ),
    tags(
        (name = CRON_JOB_TAG, description = "Cron job lifecycle and event history"),
        (name = HEALTH_TAG, description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;
