//! Process-wide map from job id to its trigger handle.
//!
//! One shared `tokio-cron-scheduler` timer drives every handle. Operations on
//! a job run under that job's own async lock, so two requests for the same
//! job never interleave while different jobs never wait on each other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler as TokioCronScheduler};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jobs::clock::Clock;
use crate::jobs::error::{JobError, JobResult};
use crate::jobs::trigger::ScheduleDescriptor;

/// What a handle fires at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    pub job_id: Uuid,
    pub target_url: String,
    pub title: String,
    pub schedule: ScheduleDescriptor,
}

impl TriggerConfig {
    fn fire_context(&self, fired_at: DateTime<Utc>) -> FireContext {
        FireContext {
            job_id: self.job_id,
            target_url: self.target_url.clone(),
            title: self.title.clone(),
            schedule: self.schedule,
            fired_at,
        }
    }
}

/// Passed to the handler on every firing.
#[derive(Debug, Clone)]
pub struct FireContext {
    pub job_id: Uuid,
    pub target_url: String,
    pub title: String,
    pub schedule: ScheduleDescriptor,
    pub fired_at: DateTime<Utc>,
}

#[async_trait]
pub trait FireHandler: Send + Sync {
    async fn on_fire(&self, ctx: FireContext);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleState {
    Running,
    Stopped,
}

/// Read-only view of a handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleInfo {
    pub config: TriggerConfig,
    pub state: HandleState,
}

struct Running {
    cron_id: Uuid,
    token: CancellationToken,
}

struct Handle {
    config: TriggerConfig,
    handler: Arc<dyn FireHandler>,
    /// Cancelled on discard; every run token is a child of it.
    token: CancellationToken,
    running: Option<Running>,
}

impl Handle {
    fn state(&self) -> HandleState {
        if self.running.is_some() {
            HandleState::Running
        } else {
            HandleState::Stopped
        }
    }

    fn info(&self) -> HandleInfo {
        HandleInfo {
            config: self.config.clone(),
            state: self.state(),
        }
    }
}

type Slot = Arc<Mutex<Option<Handle>>>;

pub struct ScheduleRegistry {
    scheduler: Arc<Mutex<TokioCronScheduler>>,
    slots: DashMap<Uuid, Slot>,
    clock: Arc<dyn Clock>,
    fail_next_schedule: AtomicBool,
}

impl ScheduleRegistry {
    pub async fn new(clock: Arc<dyn Clock>) -> JobResult<Self> {
        let scheduler = TokioCronScheduler::new().await?;

        Ok(Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            slots: DashMap::new(),
            clock,
            fail_next_schedule: AtomicBool::new(false),
        })
    }

    /// Makes the next attempt to put a handle on the timer fail.
    pub fn fail_next_schedule(&self) {
        self.fail_next_schedule.store(true, Ordering::SeqCst);
    }

    /// Starts the shared timer. Handles registered earlier begin firing.
    pub async fn run(&self) -> JobResult<()> {
        self.scheduler.lock().await.start().await?;
        Ok(())
    }

    fn slot(&self, job_id: Uuid) -> Slot {
        Arc::clone(self.slots.entry(job_id).or_default().value())
    }

    /// Looks up without inserting, so unknown ids leave no empty slot behind.
    fn existing_slot(&self, job_id: Uuid) -> JobResult<Slot> {
        self.slots
            .get(&job_id)
            .map(|s| Arc::clone(s.value()))
            .ok_or(JobError::HandleNotFound(job_id))
    }

    /// Registers a stopped handle, replacing nothing: an existing handle for
    /// the same job is left untouched and its info returned.
    pub async fn register(
        &self,
        config: TriggerConfig,
        handler: Arc<dyn FireHandler>,
    ) -> JobResult<HandleInfo> {
        let slot = self.slot(config.job_id);
        let mut guard = slot.lock().await;

        if let Some(existing) = guard.as_ref() {
            tracing::debug!(job_id = %config.job_id, "Trigger handle already registered");
            return Ok(existing.info());
        }

        let handle = Handle {
            config,
            handler,
            token: CancellationToken::new(),
            running: None,
        };
        let info = handle.info();
        *guard = Some(handle);

        tracing::debug!(job_id = %info.config.job_id, "Registered trigger handle");
        Ok(info)
    }

    /// Resumes firing. A running handle is left as is.
    pub async fn start(&self, job_id: Uuid) -> JobResult<()> {
        let slot = self.existing_slot(job_id)?;
        let mut guard = slot.lock().await;
        let handle = guard.as_mut().ok_or(JobError::HandleNotFound(job_id))?;
        self.schedule(handle).await
    }

    /// Suspends firing without dropping the handle.
    pub async fn stop(&self, job_id: Uuid) -> JobResult<()> {
        let slot = self.existing_slot(job_id)?;
        let mut guard = slot.lock().await;
        let handle = guard.as_mut().ok_or(JobError::HandleNotFound(job_id))?;
        self.unschedule(handle).await
    }

    pub async fn get(&self, job_id: Uuid) -> Option<HandleInfo> {
        let slot = self.slots.get(&job_id).map(|s| Arc::clone(s.value()))?;
        let guard = slot.lock().await;
        guard.as_ref().map(Handle::info)
    }

    /// Swaps the handle's configuration. The old handle is cancelled and the
    /// new one inherits its running state. Fails if no handle exists. If the
    /// new trigger cannot be put on the timer, the new handle is kept stopped
    /// so a later `start` can retry.
    pub async fn replace(
        &self,
        config: TriggerConfig,
        handler: Arc<dyn FireHandler>,
    ) -> JobResult<HandleInfo> {
        let job_id = config.job_id;
        let slot = self.existing_slot(job_id)?;
        let mut guard = slot.lock().await;

        let mut old = guard.take().ok_or(JobError::HandleNotFound(job_id))?;
        let was_running = old.running.is_some();
        if let Err(e) = self.unschedule(&mut old).await {
            *guard = Some(old);
            return Err(e);
        }
        old.token.cancel();

        let mut handle = Handle {
            config,
            handler,
            token: CancellationToken::new(),
            running: None,
        };
        if was_running {
            if let Err(e) = self.schedule(&mut handle).await {
                tracing::error!(
                    job_id = %job_id,
                    error = %e,
                    "Replacement trigger could not be scheduled, handle left stopped"
                );
                *guard = Some(handle);
                return Err(e);
            }
        }
        let info = handle.info();
        *guard = Some(handle);

        tracing::info!(job_id = %job_id, state = ?info.state, "Replaced trigger handle");
        Ok(info)
    }

    /// Drops the handle and cancels any firing that has not begun dispatch.
    /// Returns whether a handle existed.
    pub async fn discard(&self, job_id: Uuid) -> JobResult<bool> {
        let Some(slot) = self.slots.get(&job_id).map(|s| Arc::clone(s.value())) else {
            return Ok(false);
        };
        let mut guard = slot.lock().await;

        let existed = match guard.take() {
            Some(mut handle) => {
                if let Err(e) = self.unschedule(&mut handle).await {
                    *guard = Some(handle);
                    return Err(e);
                }
                handle.token.cancel();
                true
            }
            None => false,
        };
        drop(guard);

        self.slots
            .remove_if(&job_id, |_, slot| slot.try_lock().is_ok_and(|g| g.is_none()));

        if existed {
            tracing::info!(job_id = %job_id, "Discarded trigger handle");
        }
        Ok(existed)
    }

    /// Runs the handle's callback immediately and waits for it to finish.
    pub async fn fire_now(&self, job_id: Uuid) -> JobResult<()> {
        let (ctx, handler, token) = {
            let slot = self.existing_slot(job_id)?;
            let guard = slot.lock().await;
            let handle = guard.as_ref().ok_or(JobError::HandleNotFound(job_id))?;
            (
                handle.config.fire_context(self.clock.now()),
                Arc::clone(&handle.handler),
                handle.token.clone(),
            )
        };

        if token.is_cancelled() {
            return Err(JobError::HandleNotFound(job_id));
        }
        handler.on_fire(ctx).await;
        Ok(())
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| entry.value().try_lock().map_or(true, |g| g.is_some()))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every handle and stops the shared timer.
    pub async fn shutdown(&self) -> JobResult<()> {
        let slots: Vec<Slot> = self.slots.iter().map(|e| Arc::clone(e.value())).collect();
        for slot in slots {
            if let Some(handle) = slot.lock().await.as_ref() {
                handle.token.cancel();
            }
        }

        self.scheduler.lock().await.shutdown().await?;
        tracing::info!("Schedule registry shut down");
        Ok(())
    }

    async fn schedule(&self, handle: &mut Handle) -> JobResult<()> {
        if handle.running.is_some() {
            return Ok(());
        }
        if self.fail_next_schedule.swap(false, Ordering::SeqCst) {
            return Err(JobError::Scheduler("injected failure".to_string()));
        }

        let run_token = handle.token.child_token();
        let config = handle.config.clone();
        let handler = Arc::clone(&handle.handler);
        let clock = Arc::clone(&self.clock);
        let token = run_token.clone();

        let cron_job = Job::new_async(
            handle.config.schedule.runtime_expression().as_str(),
            move |_uuid, _lock| {
                let handler = Arc::clone(&handler);
                let config = config.clone();
                let token = token.clone();
                let fired_at = clock.now();

                Box::pin(async move {
                    run_firing(&token, handler.as_ref(), config.fire_context(fired_at)).await;
                })
            },
        )?;

        let cron_id = self.scheduler.lock().await.add(cron_job).await?;
        handle.running = Some(Running {
            cron_id,
            token: run_token,
        });

        tracing::debug!(job_id = %handle.config.job_id, cron_id = %cron_id, "Trigger handle started");
        Ok(())
    }

    async fn unschedule(&self, handle: &mut Handle) -> JobResult<()> {
        let Some(cron_id) = handle.running.as_ref().map(|r| r.cron_id) else {
            return Ok(());
        };

        self.scheduler.lock().await.remove(&cron_id).await?;
        if let Some(running) = handle.running.take() {
            running.token.cancel();
        }

        tracing::debug!(job_id = %handle.config.job_id, "Trigger handle stopped");
        Ok(())
    }
}

/// Body of every timer firing. Returns whether the handler ran; a cancelled
/// run token means the handle was stopped, replaced or discarded.
async fn run_firing(token: &CancellationToken, handler: &dyn FireHandler, ctx: FireContext) -> bool {
    if token.is_cancelled() {
        tracing::debug!(job_id = %ctx.job_id, "Skipping firing of cancelled handle");
        return false;
    }
    handler.on_fire(ctx).await;
    true
}
