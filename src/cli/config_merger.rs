//! Configuration merger for CLI arguments and config files
//!
//! CLI flags override file and environment configuration.

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, settings::Settings};

/// Applies CLI overrides on top of loaded settings
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Loads settings as the CLI asks: `--config` selects single-file mode,
    /// `--env` overrides `CRONHOOK_APP_ENV`. Validation is deferred to
    /// [`merge_cli_args`](Self::merge_cli_args).
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let environment = cli
            .env
            .map(Environment::from)
            .unwrap_or_else(Environment::from_env);

        let loader = match cli.config {
            Some(ref path) => ConfigLoader::from_file(path, environment),
            None => ConfigLoader::new()?.with_environment(environment),
        };

        Ok(Self::new(loader.load_unvalidated()?))
    }

    /// Merged and validated settings
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Serve {
            host,
            port,
            log_level,
            ..
        }) = &cli.command
        {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
            if let Some(level) = log_level {
                config.logger.level = level.as_str().to_string();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
