//! Serve command handler

use crate::config::StoreBackend;
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Runs the server, or only validates and summarises with `dry_run`.
    pub async fn execute(&self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            return self.validate_only();
        }

        Server::new(self.config.clone())
            .run()
            .await
            .map_err(|source| AppError::Internal { source })
    }

    /// Validate configuration without starting the server
    pub fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        let config = &self.config;
        println!("✓ Configuration is valid");
        println!("✓ Environment: {}", config.application.environment);
        println!("✓ Server would bind to: {}", config.server.address());
        match config.database.backend {
            StoreBackend::Postgres => println!("✓ Store: postgres"),
            StoreBackend::Memory => println!("✓ Store: in-memory (not persisted)"),
        }
        println!(
            "✓ Scheduler: {} attempt(s), {}s timeout, lookahead {}",
            config.scheduler.max_attempts,
            config.scheduler.attempt_timeout_secs,
            config.scheduler.lookahead
        );
        println!(
            "✓ Failure alerts: {}",
            if config.alerts.is_enabled() { "webhook relay" } else { "log only" }
        );

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> Settings {
        let mut config = Settings::default();
        config.database.backend = StoreBackend::Memory;
        config
    }

    #[tokio::test]
    async fn test_dry_run_with_valid_config() {
        let handler = ServeCommandHandler::new(memory_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_with_invalid_config() {
        let mut config = memory_config();
        config.server.port = 0;

        let result = ServeCommandHandler::new(config).execute(true).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }
}
