//! Repository layer for data access operations.
//!
//! Provides async PostgreSQL access for every domain table and implements
//! [`Store`] on top of them.

mod cron_job_repo;
mod event_repo;
mod user_repo;

pub use cron_job_repo::CronJobRepository;
pub use event_repo::EventRepository;
pub use user_repo::UserRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::PooledConnection;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{CronJob, CronJobChanges, Event, EventStatus, NewCronJob, NewEvent, User};
use crate::store::Store;

/// Checks a connection out of the pool, mapping pool failures.
pub(crate) async fn checkout(
    pool: &AsyncDbPool,
) -> AppResult<PooledConnection<'_, AsyncPgConnection>> {
    pool.get().await.map_err(|e| AppError::ConnectionPool {
        source: anyhow::Error::from(e),
    })
}

/// Aggregates all repositories for convenient access.
///
/// Since `AsyncDbPool` uses `Arc` internally, cloning is cheap.
#[derive(Clone)]
pub struct Repositories {
    pub users: UserRepository,
    pub cron_jobs: CronJobRepository,
    pub events: EventRepository,
}

impl Repositories {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            cron_jobs: CronJobRepository::new(pool.clone()),
            events: EventRepository::new(pool),
        }
    }
}

#[async_trait]
impl Store for Repositories {
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    async fn insert_job(&self, job: NewCronJob) -> AppResult<CronJob> {
        self.cron_jobs.create(job).await
    }

    async fn find_job(&self, job_id: Uuid) -> AppResult<Option<CronJob>> {
        self.cron_jobs.find_by_id(job_id).await
    }

    async fn update_job(&self, job_id: Uuid, changes: CronJobChanges) -> AppResult<CronJob> {
        self.cron_jobs.update(job_id, changes).await
    }

    async fn set_active(&self, job_id: Uuid, active: bool) -> AppResult<()> {
        self.cron_jobs.set_active(job_id, active).await
    }

    async fn set_failed(&self, job_id: Uuid, failed: bool) -> AppResult<()> {
        self.cron_jobs.set_failed(job_id, failed).await
    }

    async fn list_active_jobs(&self) -> AppResult<Vec<CronJob>> {
        self.cron_jobs.find_active().await
    }

    async fn delete_job_with_events(&self, job_id: Uuid) -> AppResult<()> {
        self.cron_jobs.delete_with_events(job_id).await
    }

    async fn insert_events(&self, events: Vec<NewEvent>) -> AppResult<()> {
        self.events.insert_batch(events).await
    }

    async fn count_pending(&self, job_id: Uuid) -> AppResult<usize> {
        self.events.count_pending(job_id).await
    }

    async fn list_events(&self, job_id: Uuid) -> AppResult<Vec<Event>> {
        self.events.list_for_job(job_id).await
    }

    async fn delete_pending(&self, job_id: Uuid) -> AppResult<usize> {
        self.events.delete_pending(job_id).await
    }

    async fn delete_pending_before(&self, job_id: Uuid, cutoff: DateTime<Utc>) -> AppResult<usize> {
        self.events.delete_pending_before(job_id, cutoff).await
    }

    async fn mark_nearest_pending(
        &self,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        status: EventStatus,
    ) -> AppResult<Option<Event>> {
        self.events.mark_nearest_pending(job_id, fired_at, status).await
    }

    async fn ping(&self) -> AppResult<()> {
        self.events.ping().await
    }
}
