//! Engine fixture over the in-memory store with a pinned clock.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use cronhook::config::{Settings, StoreBackend};
use cronhook::error::AppResult;
use cronhook::jobs::{ManualClock, Probe, ProbeFailure};
use cronhook::models::User;
use cronhook::services::notifications::{FailureAlert, NotificationSink};
use cronhook::services::NewJobRequest;
use cronhook::state::{AppState, EngineParts};
use cronhook::store::MemoryStore;

pub fn midnight() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap()
}

/// Answers from a script, then with the fallback once the script runs out.
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Result<(), ProbeFailure>>>,
    fallback: Result<(), ProbeFailure>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn always_ok() -> Self {
        Self::with_fallback(Ok(()))
    }

    pub fn always_failing() -> Self {
        Self::with_fallback(Err(ProbeFailure::Failed {
            status: Some(503),
            reason: "Service Unavailable".to_string(),
        }))
    }

    pub fn failing_with(failure: ProbeFailure) -> Self {
        Self::with_fallback(Err(failure))
    }

    fn with_fallback(fallback: Result<(), ProbeFailure>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn attempt(&self, url: &str, _timeout: Duration) -> Result<(), ProbeFailure> {
        self.calls.lock().unwrap().push(url.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<FailureAlert>>,
}

impl RecordingSink {
    pub fn alerts(&self) -> Vec<FailureAlert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_failure_alert(&self, alert: &FailureAlert) -> AppResult<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

pub struct Harness {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub probe: Arc<ScriptedProbe>,
    pub sink: Arc<RecordingSink>,
    pub owner: User,
}

impl Harness {
    pub async fn new(probe: ScriptedProbe) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(midnight()));
        let probe = Arc::new(probe);
        let sink = Arc::new(RecordingSink::default());

        let mut settings = Settings::default();
        settings.database.backend = StoreBackend::Memory;
        settings.scheduler.max_attempts = 3;
        settings.scheduler.retry_delay_ms = 0;

        let parts = EngineParts {
            clock: clock.clone(),
            probe: probe.clone(),
            sink: sink.clone(),
        };
        let state = AppState::with_parts(store.clone(), settings, parts)
            .await
            .unwrap();
        let owner = store.add_user("ada", "ada@example.com").unwrap();

        Self {
            state,
            store,
            clock,
            probe,
            sink,
            owner,
        }
    }

    pub fn request(url: &str, schedule: &str) -> NewJobRequest {
        NewJobRequest {
            title: "keep warm".to_string(),
            url: url.to_string(),
            schedule: schedule.to_string(),
        }
    }
}
