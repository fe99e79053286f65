//! Cron job repository for async database operations.

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use uuid::Uuid;

use super::checkout;
use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult, DatabaseErrorConverter};
use crate::models::{CronJob, CronJobChanges, NewCronJob};
use crate::schema::{cron_jobs, events};

#[derive(Clone)]
pub struct CronJobRepository {
    pool: AsyncDbPool,
}

fn not_found_as_job(job_id: Uuid) -> impl FnOnce(diesel::result::Error) -> AppError {
    move |e| match e {
        diesel::result::Error::NotFound => AppError::job_not_found(job_id),
        other => AppError::from(other),
    }
}

impl CronJobRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, job: NewCronJob) -> AppResult<CronJob> {
        let mut conn = checkout(&self.pool).await?;

        diesel::insert_into(cron_jobs::table)
            .values(&job)
            .returning(CronJob::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|e| DatabaseErrorConverter::convert_diesel_error(e, "insert cron job"))
    }

    pub async fn find_by_id(&self, job_id: Uuid) -> AppResult<Option<CronJob>> {
        let mut conn = checkout(&self.pool).await?;

        cron_jobs::table
            .find(job_id)
            .select(CronJob::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    pub async fn find_active(&self) -> AppResult<Vec<CronJob>> {
        let mut conn = checkout(&self.pool).await?;

        cron_jobs::table
            .filter(cron_jobs::active.eq(true))
            .order(cron_jobs::created_at.asc())
            .select(CronJob::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn update(&self, job_id: Uuid, changes: CronJobChanges) -> AppResult<CronJob> {
        let mut conn = checkout(&self.pool).await?;

        // An empty changeset is rejected by diesel, so read the row instead.
        if changes.is_empty() {
            return cron_jobs::table
                .find(job_id)
                .select(CronJob::as_select())
                .first(&mut conn)
                .await
                .map_err(not_found_as_job(job_id));
        }

        diesel::update(cron_jobs::table.find(job_id))
            .set(&changes)
            .returning(CronJob::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(not_found_as_job(job_id))
    }

    pub async fn set_active(&self, job_id: Uuid, active: bool) -> AppResult<()> {
        let mut conn = checkout(&self.pool).await?;

        let updated = diesel::update(cron_jobs::table.find(job_id))
            .set(cron_jobs::active.eq(active))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        if updated == 0 {
            return Err(AppError::job_not_found(job_id));
        }
        Ok(())
    }

    pub async fn set_failed(&self, job_id: Uuid, failed: bool) -> AppResult<()> {
        let mut conn = checkout(&self.pool).await?;

        let updated = diesel::update(cron_jobs::table.find(job_id))
            .set(cron_jobs::is_failed.eq(failed))
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;

        if updated == 0 {
            return Err(AppError::job_not_found(job_id));
        }
        Ok(())
    }

    /// Deletes the job's events and then the job inside one transaction.
    pub async fn delete_with_events(&self, job_id: Uuid) -> AppResult<()> {
        let mut conn = checkout(&self.pool).await?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::delete(events::table.filter(events::cron_job_id.eq(job_id)))
                    .execute(conn)
                    .await?;

                let deleted = diesel::delete(cron_jobs::table.find(job_id))
                    .execute(conn)
                    .await?;

                if deleted == 0 {
                    return Err(diesel::result::Error::NotFound);
                }
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(not_found_as_job(job_id))
    }
}
