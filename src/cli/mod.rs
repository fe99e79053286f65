//! Command-line interface
//!
//! - `parser` - clap argument definitions
//! - `validation` - value parsers for arguments
//! - `config_merger` - CLI overrides on top of file configuration
//! - `handlers` - serve and migrate commands
//! - `executor` - command dispatch

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Cli, Commands, Environment, LogLevel};

use crate::config::settings::Settings;
use crate::logger::init_logger;

/// Loads configuration and applies CLI overrides.
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_cli(cli)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    merger
        .merge_cli_args(cli)
        .map_err(|e| anyhow::anyhow!("Configuration merge error: {}", e))
}

/// Installs the global tracing subscriber from `[logger]`.
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<()> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .map_err(|e| anyhow::anyhow!("Logger configuration error: {}", e))?;

    init_logger(logger_config)
}

/// Parses arguments, loads settings, starts logging and runs the command.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_and_merge_config(&cli)?;
    init_logger_from_settings(&settings)?;

    tracing::debug!(
        version = crate::pkg_version(),
        environment = %settings.application.environment,
        "Configuration loaded"
    );

    execute_command(&cli, settings).await?;
    Ok(())
}
