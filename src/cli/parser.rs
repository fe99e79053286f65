//! CLI argument parsing with clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// HTTP cron scheduler: calls user-supplied URLs on a fixed-minute interval
#[derive(Parser, Debug)]
#[command(name = "cronhook")]
#[command(about = "Schedules recurring HTTP calls and tracks every firing")]
#[command(long_about = "
Cronhook registers recurring HTTP callbacks on fixed-minute intervals, probes
each target with bounded retries, records every firing as an event and alerts
the job owner when a target keeps failing.

EXAMPLES:
    # Start the server with the layered configuration in ./config
    cronhook serve

    # Bind to all interfaces on a custom port
    cronhook serve --host 0.0.0.0 --port 8080

    # Use a single configuration file
    cronhook --config /etc/cronhook/cronhook.toml serve

    # Check configuration without starting the server
    cronhook serve --dry-run

    # Apply, preview or revert database migrations
    cronhook migrate
    cronhook migrate --dry-run
    cronhook migrate --rollback 1
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute, `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Single configuration file instead of the layered `config/` directory
    ///
    /// Example: --config /etc/cronhook/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection (`CRONHOOK_APP_ENV`)
    ///
    /// Selects the `{env}.toml` overlay and whether API docs are served.
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Debug level logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Error level logging only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server and the scheduler (default)
    ///
    /// Examples:
    ///   cronhook serve                            # Start with defaults
    ///   cronhook serve --host 0.0.0.0 --port 80   # Bind to all interfaces on port 80
    ///   cronhook serve --dry-run                  # Validate config without starting
    Serve {
        /// Host address to bind to
        #[arg(long, value_name = "ADDRESS", value_parser = super::validation::validate_host_address)]
        host: Option<String>,

        /// Port number to listen on
        #[arg(short, long, value_name = "PORT", value_parser = super::validation::validate_port)]
        port: Option<u16>,

        /// Log level for this run; wins over --verbose and --quiet
        #[arg(long, value_enum)]
        log_level: Option<LogLevel>,

        /// Validate configuration and exit
        #[arg(long)]
        dry_run: bool,
    },
    /// Database migration operations
    ///
    /// Examples:
    ///   cronhook migrate                  # Apply all pending migrations
    ///   cronhook migrate --dry-run        # List pending migrations
    ///   cronhook migrate --rollback 3     # Revert the last 3 migrations
    Migrate {
        /// List pending migrations without applying them
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of most recent migrations to revert (1 to 100)
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Log level options
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    #[value(name = "error")]
    Error,
    #[value(name = "warn", alias = "warning")]
    Warn,
    #[value(name = "info")]
    Info,
    #[value(name = "debug")]
    Debug,
    #[value(name = "trace")]
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}

impl Cli {
    /// Whether this invocation should start the server
    pub fn is_serve(&self) -> bool {
        matches!(
            self.command,
            None | Some(Commands::Serve { dry_run: false, .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["cronhook", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_no_subcommand_serves() {
        let cli = Cli::try_parse_from(["cronhook"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.is_serve());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::try_parse_from([
            "cronhook",
            "serve",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--log-level",
            "warning",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Serve {
                host,
                port,
                log_level,
                dry_run,
            }) => {
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
                assert_eq!(port, Some(8080));
                assert_eq!(log_level, Some(LogLevel::Warn));
                assert!(!dry_run);
            }
            other => panic!("Expected Serve command, got {:?}", other),
        }
    }

    #[test]
    fn test_dry_run_does_not_serve() {
        let cli = Cli::try_parse_from(["cronhook", "serve", "--dry-run"]).unwrap();
        assert!(!cli.is_serve());
    }

    #[test]
    fn test_migrate_flags_conflict() {
        let err = Cli::try_parse_from(["cronhook", "migrate", "--dry-run", "--rollback", "2"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_environment_aliases() {
        let cli = Cli::try_parse_from(["cronhook", "--env", "prod"]).unwrap();
        assert_eq!(cli.env, Some(Environment::Production));
        assert_eq!(
            crate::config::Environment::from(Environment::Staging),
            crate::config::Environment::Staging
        );
    }

    #[test]
    fn test_conflicting_verbose_quiet() {
        let err = Cli::try_parse_from(["cronhook", "--verbose", "--quiet"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
