//! Application state for Axum web framework.
//!
//! Wires the scheduling engine together and exposes it to request handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::error::AppResult;
use crate::jobs::{
    Clock, EventLedger, Executor, HttpProbe, Probe, RetryPolicy, ScheduleRegistry, SystemClock,
};
use crate::services::notifications::{
    NotificationProvider, NotificationService, NotificationSink, WebhookProvider,
};
use crate::services::LifecycleCoordinator;
use crate::store::Store;

/// Replaceable collaborators of the engine.
pub struct EngineParts {
    pub clock: Arc<dyn Clock>,
    pub probe: Arc<dyn Probe>,
    pub sink: Arc<dyn NotificationSink>,
}

impl EngineParts {
    /// Wall clock, HTTP probe and the alert relay from `[alerts]`.
    pub fn from_settings(settings: &Settings) -> Self {
        let provider = WebhookProvider::from_config(&settings.alerts)
            .map(|p| Arc::new(p) as Arc<dyn NotificationProvider>);
        let notifications = NotificationService::new(provider);
        tracing::info!(
            provider = notifications.provider_name(),
            "Failure alerts configured"
        );

        Self {
            clock: Arc::new(SystemClock),
            probe: Arc::new(HttpProbe),
            sink: Arc::new(notifications),
        }
    }
}

/// Cloning is cheap; every member is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: LifecycleCoordinator,
    /// Direct access for health checks
    pub store: Arc<dyn Store>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub async fn new(store: Arc<dyn Store>, settings: Settings) -> AppResult<Self> {
        let parts = EngineParts::from_settings(&settings);
        Self::with_parts(store, settings, parts).await
    }

    /// Builds registry, ledger, executor and coordinator around `store`.
    ///
    /// The registry's timer is not started here; see [`ScheduleRegistry::run`].
    pub async fn with_parts(
        store: Arc<dyn Store>,
        settings: Settings,
        parts: EngineParts,
    ) -> AppResult<Self> {
        let scheduler = &settings.scheduler;

        let registry = Arc::new(ScheduleRegistry::new(parts.clock.clone()).await?);
        let ledger = Arc::new(EventLedger::new(
            store.clone(),
            parts.clock,
            scheduler.lookahead,
        ));
        let executor = Arc::new(Executor::new(
            store.clone(),
            ledger.clone(),
            parts.probe,
            parts.sink,
            RetryPolicy::from_config(scheduler),
            scheduler.attempt_timeout(),
        ));

        Ok(Self {
            lifecycle: LifecycleCoordinator::new(store.clone(), registry, ledger, executor),
            store,
            settings: Arc::new(settings),
        })
    }
}
