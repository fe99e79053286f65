use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use crate::error::{AppError, AppResult};
use crate::jobs::ledger::EventLedger;
use crate::jobs::probe::{Probe, ProbeFailure};
use crate::jobs::registry::{FireContext, FireHandler};
use crate::jobs::retry::{AttemptState, DispatchOutcome, RetryPolicy};
use crate::models::{CronJob, EventStatus};
use crate::services::notifications::{FailureAlert, NotificationSink};
use crate::store::Store;

/// Calls a job's target with bounded retries and records the outcome
pub struct Executor {
    store: Arc<dyn Store>,
    ledger: Arc<EventLedger>,
    probe: Arc<dyn Probe>,
    sink: Arc<dyn NotificationSink>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl Executor {
    pub fn new(
        store: Arc<dyn Store>,
        ledger: Arc<EventLedger>,
        probe: Arc<dyn Probe>,
        sink: Arc<dyn NotificationSink>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            probe,
            sink,
            policy,
            attempt_timeout,
        }
    }

    /// Runs attempts until one succeeds or the policy is exhausted.
    pub async fn dispatch(&self, target_url: &str) -> DispatchOutcome {
        let mut state = AttemptState::start();

        loop {
            let attempt = match state {
                AttemptState::Attempting(n) => n,
                AttemptState::Succeeded { attempts } => {
                    return DispatchOutcome::Succeeded { attempts };
                }
                AttemptState::Exhausted {
                    attempts,
                    last_failure,
                } => {
                    return DispatchOutcome::Exhausted {
                        attempts,
                        last_failure,
                    };
                }
            };

            let result = self.probe.attempt(target_url, self.attempt_timeout).await;
            if let Err(failure) = &result {
                tracing::warn!(url = target_url, attempt, error = %failure, "Attempt failed");
            }

            state = state.advance(result, &self.policy);

            if !state.is_terminal() {
                let delay = self.policy.backoff.delay_after(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt with no retry and no ledger interaction.
    pub async fn test_run(&self, url: &str) -> Result<(), ProbeFailure> {
        self.probe.attempt(url, self.attempt_timeout).await
    }

    /// Dispatch, then flag/alert, then mark the event, then top up.
    pub async fn handle_firing(&self, ctx: &FireContext) -> AppResult<DispatchOutcome> {
        let outcome = self.dispatch(&ctx.target_url).await;

        let status = match &outcome {
            DispatchOutcome::Succeeded { attempts } => {
                tracing::info!(attempts, "Firing succeeded");
                EventStatus::Success
            }
            DispatchOutcome::Exhausted {
                attempts,
                last_failure,
            } => {
                tracing::error!(attempts, error = %last_failure, "Retries exhausted");
                EventStatus::Failure
            }
        };

        let Some(job) = self.store.find_job(ctx.job_id).await? else {
            tracing::warn!("Job vanished during firing");
            return Ok(outcome);
        };

        match self.store.set_failed(job.id, !outcome.is_success()).await {
            Err(AppError::NotFound { .. }) => {
                tracing::warn!("Job vanished during firing");
                return Ok(outcome);
            }
            other => other?,
        }

        if !outcome.is_success() {
            self.alert_owner(&job).await;
        }

        self.ledger
            .mark_outcome(ctx.job_id, ctx.fired_at, status)
            .await?;

        if job.active {
            self.ledger.top_up(ctx.job_id, &ctx.schedule).await?;
        } else {
            tracing::debug!("Job disabled during firing, skipping top-up");
        }

        Ok(outcome)
    }

    async fn alert_owner(&self, job: &CronJob) {
        let recipient = match self.store.find_user(job.user_id).await {
            Ok(user) => user.map(|u| u.email),
            Err(e) => {
                tracing::warn!(error = %e, "Could not look up alert recipient");
                None
            }
        };

        let alert = FailureAlert {
            job_id: job.id,
            title: job.title.clone(),
            url: job.url.clone(),
            recipient,
        };
        if let Err(e) = self.sink.send_failure_alert(&alert).await {
            tracing::error!(error = %e, "Failed to deliver failure alert");
        }
    }
}

#[async_trait]
impl FireHandler for Executor {
    async fn on_fire(&self, ctx: FireContext) {
        let span = tracing::info_span!("firing", job_id = %ctx.job_id, fired_at = %ctx.fired_at);
        if let Err(e) = self.handle_firing(&ctx).instrument(span).await {
            tracing::error!(job_id = %ctx.job_id, error = %e, "Firing bookkeeping failed");
        }
    }
}
