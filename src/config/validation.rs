//! Configuration validation logic
//!
//! Each section validates its own ranges; `Settings::validate` returns the
//! first error encountered.

use crate::config::error::ConfigError;
use crate::config::settings::{
    AlertsConfig, DatabaseConfig, FileSettings, LoggerSettings, SchedulerConfig, ServerConfig,
    Settings, StoreBackend,
};

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl ServerConfig {
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    /// - Request timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// # Validation Rules
    /// - URL is required for the postgres backend and must use a postgres scheme
    /// - Min connections must be positive and not exceed max connections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend == StoreBackend::Memory {
            return Ok(());
        }

        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
        {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// The leading directive must be a known level; per-target overrides
    /// after the first comma are passed through to `EnvFilter`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let head = self.level.split(',').next().unwrap_or_default().trim();
        if !VALID_LOG_LEVELS.contains(&head.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()
    }
}

/// Upper bound on attempts per firing
pub const MAX_ATTEMPTS_PER_FIRING: u32 = 20;

impl SchedulerConfig {
    /// # Validation Rules
    /// - Between 1 and `MAX_ATTEMPTS_PER_FIRING` attempts per firing
    /// - Per-attempt timeout greater than 0
    /// - Backoff multiplier of at least 1.0
    /// - Lookahead window of at least 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::validation(
                "scheduler.max_attempts",
                "At least one attempt per firing is required.",
            ));
        }

        if self.max_attempts > MAX_ATTEMPTS_PER_FIRING {
            return Err(ConfigError::ValidationError {
                field: "scheduler.max_attempts".to_string(),
                message: format!(
                    "At most {} attempts per firing are allowed, got {}.",
                    MAX_ATTEMPTS_PER_FIRING, self.max_attempts
                ),
            });
        }

        if self.attempt_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "scheduler.attempt_timeout_secs",
                "Attempt timeout must be greater than 0 seconds.",
            ));
        }

        if !self.retry_backoff_multiplier.is_finite() || self.retry_backoff_multiplier < 1.0 {
            return Err(ConfigError::ValidationError {
                field: "scheduler.retry_backoff_multiplier".to_string(),
                message: format!(
                    "Backoff multiplier must be at least 1.0, got {}.",
                    self.retry_backoff_multiplier
                ),
            });
        }

        if self.lookahead == 0 {
            return Err(ConfigError::validation(
                "scheduler.lookahead",
                "Lookahead window must hold at least one event.",
            ));
        }

        Ok(())
    }
}

impl AlertsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_enabled()
            && !(self.webhook_url.starts_with("http://") || self.webhook_url.starts_with("https://"))
        {
            return Err(ConfigError::validation(
                "alerts.webhook_url",
                "Alert webhook URL must start with http:// or https://.",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "alerts.timeout_secs",
                "Alert timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logger.validate()?;
        self.scheduler.validate()?;
        self.alerts.validate()?;
        Ok(())
    }
}
