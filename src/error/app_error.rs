use crate::error::DatabaseErrorConverter;
use crate::jobs::ProbeFailure;
use thiserror::Error;

/// Application-wide error type that represents all possible errors in the system.
///
/// Validation and authorization variants are raised before any state is
/// mutated; the remaining variants wrap failures from the store, the
/// connection pool or an outbound probe.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Schedule descriptor that cannot produce future fire times
    #[error("Invalid schedule '{schedule}': {reason}")]
    InvalidSchedule { schedule: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Unauthorized access error, raised for unknown users or foreign jobs
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Ad-hoc probe of a target URL did not succeed
    #[error("Probe of {url} failed: {failure}")]
    Probe { url: String, failure: ProbeFailure },

    /// Database operation error with operation context
    #[error("Database operation failed: {operation}")]
    Database {
        operation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Connection pool error
    #[error("Connection pool error")]
    ConnectionPool {
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    /// Shorthand for a missing cron job.
    pub fn job_not_found(job_id: impl ToString) -> Self {
        AppError::NotFound {
            entity: "cron_job".to_string(),
            field: "id".to_string(),
            value: job_id.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(error: diesel::result::Error) -> Self {
        DatabaseErrorConverter::convert_diesel_error(error, "database operation")
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_not_found_carries_id() {
        let error = AppError::job_not_found("abc");
        assert_eq!(
            error.to_string(),
            "Resource not found: cron_job with id=abc"
        );
    }

    #[test]
    fn test_anyhow_becomes_internal() {
        let error: AppError = anyhow::anyhow!("boom").into();
        assert!(matches!(error, AppError::Internal { .. }));
    }

    #[test]
    fn test_invalid_schedule_message() {
        let error = AppError::InvalidSchedule {
            schedule: "0".to_string(),
            reason: "interval must be a positive integer".to_string(),
        };
        assert!(error.to_string().contains("'0'"));
    }
}
