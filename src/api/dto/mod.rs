//! Data Transfer Objects for API requests and responses.
//!
//! - `cron_job` - cron job and event DTOs
//! - `error` - common error response DTO
//! - `health` - health check DTOs

mod cron_job;
mod error;
mod health;

pub use cron_job::{
    CreateCronJobRequest, CronJobActionRequest, CronJobQuery, CronJobResponse, EventResponse,
    MessageResponse, TestCronJobRequest, UpdateCronJobRequest,
};
pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
