//! Persistence seam for users, cron jobs and events.
//!
//! `Repositories` implements [`Store`] on PostgreSQL; [`MemoryStore`] keeps
//! everything in process memory for tests and demo runs.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{CronJob, CronJobChanges, Event, EventStatus, NewCronJob, NewEvent, User};

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    async fn insert_job(&self, job: NewCronJob) -> AppResult<CronJob>;

    async fn find_job(&self, job_id: Uuid) -> AppResult<Option<CronJob>>;

    /// Applies the present fields; fails with `NotFound` for unknown jobs.
    async fn update_job(&self, job_id: Uuid, changes: CronJobChanges) -> AppResult<CronJob>;

    async fn set_active(&self, job_id: Uuid, active: bool) -> AppResult<()>;

    async fn set_failed(&self, job_id: Uuid, failed: bool) -> AppResult<()>;

    async fn list_active_jobs(&self) -> AppResult<Vec<CronJob>>;

    /// Removes every event of the job and then the job itself in one
    /// transaction. Either both are gone afterwards or neither is.
    async fn delete_job_with_events(&self, job_id: Uuid) -> AppResult<()>;

    /// Inserts all events in a single statement.
    async fn insert_events(&self, events: Vec<NewEvent>) -> AppResult<()>;

    async fn count_pending(&self, job_id: Uuid) -> AppResult<usize>;

    /// All events of a job, newest firing first.
    async fn list_events(&self, job_id: Uuid) -> AppResult<Vec<Event>>;

    async fn delete_pending(&self, job_id: Uuid) -> AppResult<usize>;

    async fn delete_pending_before(&self, job_id: Uuid, cutoff: DateTime<Utc>) -> AppResult<usize>;

    /// Sets `status` on the PENDING event whose firing time is closest to
    /// `fired_at`. Returns the updated event, or `None` if nothing was pending.
    async fn mark_nearest_pending(
        &self,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        status: EventStatus,
    ) -> AppResult<Option<Event>>;

    /// Cheap reachability check for the health endpoint.
    async fn ping(&self) -> AppResult<()>;
}

/// Picks the event whose `time` is nearest `target`; ties go to the earlier one.
pub(crate) fn nearest_event<'a, I>(events: I, target: DateTime<Utc>) -> Option<&'a Event>
where
    I: IntoIterator<Item = &'a Event>,
{
    events
        .into_iter()
        .min_by_key(|event| ((event.time - target).num_milliseconds().abs(), event.time))
}
