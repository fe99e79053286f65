//! Server module for managing HTTP server lifecycle
//!
//! Builds the store, restores active jobs, serves HTTP and shuts the
//! scheduler down after the listener stops.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::{Settings, StoreBackend};
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::repositories::Repositories;
use crate::state::AppState;
use crate::store::{MemoryStore, Store};

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the server and run until a shutdown signal
    ///
    /// 1. Builds the configured store, migrating first when `auto_migrate` is set
    /// 2. Wires the scheduling engine and starts its timer
    /// 3. Restores every active job when `restore_on_startup` is set
    /// 4. Serves HTTP with graceful shutdown, then stops the timer
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %self.settings.application.environment,
            "Application starting"
        );

        tracing::info!(
            host = %self.settings.server.host,
            port = %self.settings.server.port,
            request_timeout = %self.settings.server.request_timeout,
            "Server configuration loaded"
        );

        tracing::info!(
            max_attempts = self.settings.scheduler.max_attempts,
            attempt_timeout_secs = self.settings.scheduler.attempt_timeout_secs,
            lookahead = self.settings.scheduler.lookahead,
            restore_on_startup = self.settings.scheduler.restore_on_startup,
            "Scheduler configuration loaded"
        );

        let store = build_store(&self.settings).await?;

        let state = AppState::new(store, self.settings.clone()).await?;
        let lifecycle = state.lifecycle.clone();

        lifecycle.registry().run().await?;
        tracing::info!("Schedule registry started");

        if self.settings.scheduler.restore_on_startup {
            lifecycle.restore_active_jobs().await?;
        }

        let router = create_router(state);

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped, shutting down scheduler");
        if let Err(e) = lifecycle.registry().shutdown().await {
            tracing::error!(error = %e, "Scheduler shutdown failed");
        }

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Opens the configured backend.
async fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn Store>> {
    let database = &settings.database;

    match database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            tracing::info!(
                max_connections = database.max_connections,
                min_connections = database.min_connections,
                connection_timeout = database.connection_timeout,
                "Database configuration loaded"
            );

            if database.auto_migrate {
                let applied = run_pending_migrations(&database.url).await?;
                tracing::info!(count = applied.len(), "Applied pending migrations");
            }

            tracing::info!("Initializing database connection pool...");
            let pool = establish_async_connection_pool(database).await?;
            tracing::info!("Database connection pool initialized");

            Ok(Arc::new(Repositories::new(pool)))
        }
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
