//! Cron job DTOs for API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CronJob, CronJobChanges, Event, EventStatus};
use crate::services::NewJobRequest;

// ============================================================================
// Request DTOs
// ============================================================================

/// Accepts the schedule as `"5"` or `5`; it is stored as received.
fn schedule_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

fn optional_schedule_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    schedule_text(deserializer).map(Some)
}

/// Request body for registering a new cron job.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "userId": "8f14e45f-ceea-467f-a0f0-6d4b3c9e1f2a",
    "title": "Keep the demo warm",
    "url": "https://demo.example.com/ping",
    "schedule": "5"
}))]
pub struct CreateCronJobRequest {
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: String,

    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    /// Interval in minutes, 1 to 59
    #[serde(deserialize_with = "schedule_text")]
    #[schema(value_type = String, example = "5")]
    #[validate(length(min = 1, max = 16, message = "Schedule is required"))]
    pub schedule: String,
}

impl CreateCronJobRequest {
    pub fn into_parts(self) -> (Uuid, NewJobRequest) {
        (
            self.user_id,
            NewJobRequest {
                title: self.title,
                url: self.url,
                schedule: self.schedule,
            },
        )
    }
}

/// Request body for a one-off probe of a URL.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TestCronJobRequest {
    #[validate(url(message = "Invalid URL format"))]
    #[schema(example = "https://demo.example.com/ping")]
    pub url: String,
}

/// Identifies one job of one user; used by enable and disable.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CronJobActionRequest {
    pub user_id: Uuid,
    pub cron_job_id: Uuid,
}

/// Request body for a partial update. At least one field is required.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCronJobRequest {
    pub cron_job_id: Uuid,
    pub user_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be between 1 and 255 characters"))]
    pub title: Option<String>,

    #[validate(url(message = "Invalid URL format"))]
    pub url: Option<String>,

    #[serde(default, deserialize_with = "optional_schedule_text")]
    #[schema(value_type = Option<String>, example = "10")]
    #[validate(length(min = 1, max = 16, message = "Schedule must not be empty"))]
    pub schedule: Option<String>,
}

impl UpdateCronJobRequest {
    pub fn changes(&self) -> CronJobChanges {
        CronJobChanges {
            title: self.title.clone(),
            url: self.url.clone(),
            cron_schedule: self.schedule.clone(),
        }
    }
}

/// Query parameters identifying one job of one user.
#[derive(Debug, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CronJobQuery {
    pub user_id: Uuid,
    pub cron_job_id: Uuid,
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CronJobResponse {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    #[schema(example = "5")]
    pub schedule: String,
    pub active: bool,
    pub is_failed: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<CronJob> for CronJobResponse {
    fn from(job: CronJob) -> Self {
        Self {
            id: job.id,
            title: job.title,
            url: job.url,
            schedule: job.cron_schedule,
            active: job.active,
            is_failed: job.is_failed,
            user_id: job.user_id,
            created_at: job.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub id: Uuid,
    pub cron_job_id: Uuid,
    pub time: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            cron_job_id: event.cron_job_id,
            time: event.time,
            status: event.status,
            created_at: event.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Cron job deleted")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
