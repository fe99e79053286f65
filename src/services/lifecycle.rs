//! Job lifecycle: the only place that touches the store, the schedule
//! registry and the event ledger together.

use std::sync::Arc;

use reqwest::Url;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::jobs::{
    EventLedger, Executor, FireHandler, HandleState, ScheduleDescriptor, ScheduleRegistry,
    TriggerConfig,
};
use crate::models::{CronJob, CronJobChanges, Event, NewCronJob};
use crate::store::Store;

/// Input for [`LifecycleCoordinator::create`].
#[derive(Debug, Clone)]
pub struct NewJobRequest {
    pub title: String,
    pub url: String,
    pub schedule: String,
}

#[derive(Clone)]
pub struct LifecycleCoordinator {
    store: Arc<dyn Store>,
    registry: Arc<ScheduleRegistry>,
    ledger: Arc<EventLedger>,
    executor: Arc<Executor>,
}

fn trigger_config(job: &CronJob, schedule: ScheduleDescriptor) -> TriggerConfig {
    TriggerConfig {
        job_id: job.id,
        target_url: job.url.clone(),
        title: job.title.clone(),
        schedule,
    }
}

fn validate_target(url: &str) -> AppResult<()> {
    let parsed = Url::parse(url).map_err(|e| AppError::Validation {
        field: "url".to_string(),
        reason: format!("Invalid URL: {}", e),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::Validation {
            field: "url".to_string(),
            reason: "Only HTTP(S) URLs can be scheduled".to_string(),
        });
    }
    Ok(())
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation {
            field: "title".to_string(),
            reason: "Title must not be blank".to_string(),
        });
    }
    Ok(())
}

impl LifecycleCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<ScheduleRegistry>,
        ledger: Arc<EventLedger>,
        executor: Arc<Executor>,
    ) -> Self {
        Self {
            store,
            registry,
            ledger,
            executor,
        }
    }

    pub fn registry(&self) -> &ScheduleRegistry {
        &self.registry
    }

    fn handler(&self) -> Arc<dyn FireHandler> {
        self.executor.clone()
    }

    async fn require_user(&self, owner: Uuid) -> AppResult<()> {
        match self.store.find_user(owner).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Unauthorized {
                message: format!("Unknown user {}", owner),
            }),
        }
    }

    /// Unknown user or foreign job is unauthorized; a missing job is not found.
    async fn authorize(&self, owner: Uuid, job_id: Uuid) -> AppResult<CronJob> {
        self.require_user(owner).await?;

        let job = self
            .store
            .find_job(job_id)
            .await?
            .ok_or_else(|| AppError::job_not_found(job_id))?;

        if job.user_id != owner {
            return Err(AppError::Unauthorized {
                message: format!("Cron job {} does not belong to user {}", job_id, owner),
            });
        }
        Ok(job)
    }

    async fn start_handle(&self, job: &CronJob, schedule: ScheduleDescriptor) -> AppResult<()> {
        self.registry
            .register(trigger_config(job, schedule), self.handler())
            .await?;
        self.registry.start(job.id).await?;
        Ok(())
    }

    /// Plans the seed events before anything is written, so a bad schedule
    /// leaves no job row and no handle behind.
    pub async fn create(&self, owner: Uuid, request: NewJobRequest) -> AppResult<CronJob> {
        validate_title(&request.title)?;
        validate_target(&request.url)?;
        let schedule: ScheduleDescriptor = request.schedule.parse()?;
        self.require_user(owner).await?;

        let job_id = Uuid::new_v4();
        let seed = self.ledger.plan(job_id, &schedule, self.ledger.lookahead())?;

        let job = self
            .store
            .insert_job(NewCronJob {
                id: job_id,
                title: request.title,
                url: request.url,
                cron_schedule: request.schedule,
                active: true,
                is_failed: false,
                user_id: owner,
                created_at: self.ledger.now(),
            })
            .await?;

        self.ledger.record(seed).await?;
        self.start_handle(&job, schedule).await?;

        tracing::info!(job_id = %job.id, user_id = %owner, schedule = %schedule, "Created cron job");
        Ok(job)
    }

    pub async fn enable(&self, owner: Uuid, job_id: Uuid) -> AppResult<CronJob> {
        let mut job = self.authorize(owner, job_id).await?;
        let schedule: ScheduleDescriptor = job.cron_schedule.parse()?;

        self.store.set_active(job_id, true).await?;
        job.active = true;

        self.ledger.purge_pending(job_id).await?;
        self.ledger.seed(job_id, &schedule).await?;

        // register is a no-op for an existing handle, start resumes it
        self.start_handle(&job, schedule).await?;

        self.ledger
            .purge_pending_before(job_id, self.ledger.now())
            .await?;

        tracing::info!(job_id = %job_id, "Enabled cron job");
        Ok(job)
    }

    /// Keeps history and the stopped handle so enable can resume cheaply.
    pub async fn disable(&self, owner: Uuid, job_id: Uuid) -> AppResult<CronJob> {
        let mut job = self.authorize(owner, job_id).await?;

        self.store.set_active(job_id, false).await?;
        job.active = false;

        self.ledger.purge_pending(job_id).await?;

        if self.registry.get(job_id).await.is_some() {
            self.registry.stop(job_id).await?;
        }

        tracing::info!(job_id = %job_id, "Disabled cron job");
        Ok(job)
    }

    /// A foreign or missing job is reported as not found.
    pub async fn update(
        &self,
        owner: Uuid,
        job_id: Uuid,
        changes: CronJobChanges,
    ) -> AppResult<CronJob> {
        if changes.is_empty() {
            return Err(AppError::BadRequest {
                message: "At least one of title, url or schedule is required".to_string(),
            });
        }

        let current = self
            .store
            .find_job(job_id)
            .await?
            .filter(|job| job.user_id == owner)
            .ok_or_else(|| AppError::job_not_found(job_id))?;

        if let Some(title) = &changes.title {
            validate_title(title)?;
        }
        if let Some(url) = &changes.url {
            validate_target(url)?;
        }

        let schedule: ScheduleDescriptor = changes
            .cron_schedule
            .as_deref()
            .unwrap_or(&current.cron_schedule)
            .parse()?;
        if changes.cron_schedule.is_some() {
            self.ledger.plan(job_id, &schedule, self.ledger.lookahead())?;
        }

        let job = self.store.update_job(job_id, changes).await?;

        if self.registry.get(job_id).await.is_none() {
            tracing::info!(job_id = %job_id, "Updated cron job without live handle");
            return Ok(job);
        }

        let info = self
            .registry
            .replace(trigger_config(&job, schedule), self.handler())
            .await?;

        if job.active {
            if info.state == HandleState::Stopped {
                self.registry.start(job_id).await?;
            }
            self.ledger.purge_pending(job_id).await?;
            self.ledger.seed(job_id, &schedule).await?;
        } else if info.state == HandleState::Running {
            self.registry.stop(job_id).await?;
        }

        tracing::info!(job_id = %job_id, active = job.active, "Updated cron job");
        Ok(job)
    }

    /// Removes events and the job in one transaction, then the handle.
    pub async fn delete(&self, owner: Uuid, job_id: Uuid) -> AppResult<()> {
        self.authorize(owner, job_id).await?;

        self.store.delete_job_with_events(job_id).await?;
        self.registry.discard(job_id).await?;
        self.ledger.forget(job_id);

        tracing::info!(job_id = %job_id, "Deleted cron job");
        Ok(())
    }

    /// The job's events, newest first.
    pub async fn history(&self, owner: Uuid, job_id: Uuid) -> AppResult<Vec<Event>> {
        self.authorize(owner, job_id).await?;
        self.ledger.history(job_id).await
    }

    /// One unretried probe of `url`.
    pub async fn test_target(&self, url: &str) -> AppResult<()> {
        validate_target(url)?;
        self.executor
            .test_run(url)
            .await
            .map_err(|failure| AppError::Probe {
                url: url.to_string(),
                failure,
            })
    }

    /// Rebuilds handles and fresh lookahead windows for every active job.
    ///
    /// A job that cannot be restored is logged and skipped.
    pub async fn restore_active_jobs(&self) -> AppResult<usize> {
        let jobs = self.store.list_active_jobs().await?;
        let total = jobs.len();
        let mut restored = 0;

        for job in jobs {
            match self.restore(&job).await {
                Ok(()) => restored += 1,
                Err(e) => {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to restore cron job")
                }
            }
        }

        tracing::info!(restored, total, "Restored active cron jobs");
        Ok(restored)
    }

    async fn restore(&self, job: &CronJob) -> AppResult<()> {
        let schedule: ScheduleDescriptor = job.cron_schedule.parse()?;
        self.ledger.purge_pending(job.id).await?;
        self.ledger.seed(job.id, &schedule).await?;
        self.start_handle(job, schedule).await
    }
}
