use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// Errors raised by the trigger engine and the schedule registry
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid schedule descriptor '{descriptor}': {reason}")]
    InvalidScheduleDescriptor { descriptor: String, reason: String },

    #[error("Fire time {fire_time} is not after {now}")]
    NonFutureFireTime { fire_time: String, now: String },

    #[error("No trigger handle registered for job {0}")]
    HandleNotFound(Uuid),

    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<tokio_cron_scheduler::JobSchedulerError> for JobError {
    fn from(error: tokio_cron_scheduler::JobSchedulerError) -> Self {
        JobError::Scheduler(error.to_string())
    }
}

impl From<JobError> for AppError {
    fn from(error: JobError) -> Self {
        match error {
            JobError::InvalidScheduleDescriptor { descriptor, reason } => AppError::InvalidSchedule {
                schedule: descriptor,
                reason,
            },
            JobError::NonFutureFireTime { fire_time, now } => AppError::InvalidSchedule {
                schedule: fire_time,
                reason: format!("computed fire time is not after {}", now),
            },
            JobError::HandleNotFound(job_id) => AppError::NotFound {
                entity: "trigger_handle".to_string(),
                field: "job_id".to_string(),
                value: job_id.to_string(),
            },
            JobError::Scheduler(message) => AppError::Internal {
                source: anyhow::anyhow!(message),
            },
        }
    }
}

pub type JobResult<T> = Result<T, JobError>;
