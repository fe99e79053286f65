//! Migrate command handler
//!
//! Applies, previews or reverts the embedded migrations.

use crate::config::StoreBackend;
use crate::config::settings::Settings;
use crate::db::{pending_migrations, revert_migrations, run_pending_migrations};
use crate::error::{AppError, AppResult};

/// Handler for the migrate command
pub struct MigrateCommandHandler {
    config: Settings,
}

impl MigrateCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// # Errors
    /// - The memory backend has nothing to migrate
    /// - Database connection or migration failures
    pub async fn execute(&self, dry_run: bool, rollback: Option<u32>) -> AppResult<()> {
        if self.config.database.backend == StoreBackend::Memory {
            return Err(AppError::Validation {
                field: "database.backend".to_string(),
                reason: "Migrations require the postgres backend".to_string(),
            });
        }
        self.config.database.validate()?;

        let url = &self.config.database.url;
        if dry_run {
            let pending = pending_migrations(url).await?;
            if pending.is_empty() {
                println!("✓ No pending migrations - database is up to date");
            } else {
                println!("Found {} pending migration(s):", pending.len());
                for name in &pending {
                    println!("  - {}", name);
                }
                println!("\nRun without --dry-run to apply these migrations");
            }
            return Ok(());
        }

        match rollback {
            Some(steps) => {
                println!("Rolling back {} migration(s)...", steps);
                let reverted = revert_migrations(url, steps).await?;
                tracing::info!(reverted, "Reverted migrations");
                println!("✓ Rolled back {} migration(s)", reverted);
            }
            None => {
                println!("Running database migrations...");
                let applied = run_pending_migrations(url).await?;
                tracing::info!(count = applied.len(), "Applied migrations");
                if applied.is_empty() {
                    println!("✓ No migrations to apply - database is already up to date");
                } else {
                    println!("✓ Applied {} migration(s):", applied.len());
                    for version in &applied {
                        println!("  - {}", version);
                    }
                }
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}
