//! Configuration error types

use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Validation error with field and message
    #[error("Validation error: {field} - {message}")]
    ValidationError { field: String, message: String },

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVarError(String),

    /// Mutual exclusivity error
    #[error("Mutual exclusivity error: {0}")]
    MutualExclusivityError(String),

    /// Generic configuration error from config crate
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found<S: Into<String>>(path: S) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity<S: Into<String>>(message: S) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}

impl From<ConfigError> for crate::error::AppError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::ValidationError { field, message } => crate::error::AppError::Validation {
                field,
                reason: message,
            },
            other => crate::error::AppError::Internal {
                source: anyhow::Error::from(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_validation_error_keeps_field() {
        let error: AppError = ConfigError::validation("server.port", "out of range").into();
        assert!(matches!(
            error,
            AppError::Validation { ref field, .. } if field == "server.port"
        ));
    }

    #[test]
    fn test_other_errors_are_internal() {
        let error: AppError = ConfigError::file_not_found("config/default.toml").into();
        assert!(matches!(error, AppError::Internal { .. }));
    }
}
