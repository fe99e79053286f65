//! Command executor for dispatching CLI commands

use super::handlers::{MigrateCommandHandler, ServeCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::AppResult;

/// Dispatches the parsed command; no subcommand means `serve`.
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    warn_on_risky_args(cli);

    match &cli.command {
        Some(Commands::Serve { dry_run, .. }) => {
            ServeCommandHandler::new(settings).execute(*dry_run).await
        }
        None => ServeCommandHandler::new(settings).execute(false).await,
        Some(Commands::Migrate { dry_run, rollback }) => {
            MigrateCommandHandler::new(settings)
                .execute(*dry_run, *rollback)
                .await
        }
    }
}

/// Arguments that are valid but worth a second look
fn warn_on_risky_args(cli: &Cli) {
    match &cli.command {
        Some(Commands::Serve {
            host: Some(host),
            port: Some(port),
            ..
        }) if *port < 1024 && host == "0.0.0.0" => {
            tracing::warn!(port, "Binding to 0.0.0.0 on a privileged port usually requires root");
        }
        Some(Commands::Migrate {
            rollback: Some(steps),
            ..
        }) if *steps > 10 => {
            tracing::warn!(steps, "Rolling back many migrations; consider smaller steps");
        }
        _ => {}
    }
}
