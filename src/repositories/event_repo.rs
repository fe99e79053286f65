//! Event repository for async database operations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::checkout;
use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::{Event, EventStatus, NewEvent};
use crate::schema::events;
use crate::store::nearest_event;

#[derive(Clone)]
pub struct EventRepository {
    pool: AsyncDbPool,
}

impl EventRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    pub async fn insert_batch(&self, batch: Vec<NewEvent>) -> AppResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut conn = checkout(&self.pool).await?;

        diesel::insert_into(events::table)
            .values(&batch)
            .execute(&mut conn)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }

    pub async fn count_pending(&self, job_id: Uuid) -> AppResult<usize> {
        let mut conn = checkout(&self.pool).await?;

        let count: i64 = events::table
            .filter(events::cron_job_id.eq(job_id))
            .filter(events::status.eq(EventStatus::Pending))
            .count()
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)?;

        Ok(count as usize)
    }

    /// Full history, newest firing first
    pub async fn list_for_job(&self, job_id: Uuid) -> AppResult<Vec<Event>> {
        let mut conn = checkout(&self.pool).await?;

        events::table
            .filter(events::cron_job_id.eq(job_id))
            .order(events::time.desc())
            .select(Event::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    pub async fn delete_pending(&self, job_id: Uuid) -> AppResult<usize> {
        let mut conn = checkout(&self.pool).await?;

        diesel::delete(
            events::table
                .filter(events::cron_job_id.eq(job_id))
                .filter(events::status.eq(EventStatus::Pending)),
        )
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn delete_pending_before(
        &self,
        job_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> AppResult<usize> {
        let mut conn = checkout(&self.pool).await?;

        diesel::delete(
            events::table
                .filter(events::cron_job_id.eq(job_id))
                .filter(events::status.eq(EventStatus::Pending))
                .filter(events::time.lt(cutoff)),
        )
        .execute(&mut conn)
        .await
        .map_err(AppError::from)
    }

    pub async fn mark_nearest_pending(
        &self,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        status: EventStatus,
    ) -> AppResult<Option<Event>> {
        let mut conn = checkout(&self.pool).await?;

        let pending: Vec<Event> = events::table
            .filter(events::cron_job_id.eq(job_id))
            .filter(events::status.eq(EventStatus::Pending))
            .select(Event::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)?;

        let Some(target) = nearest_event(&pending, fired_at) else {
            return Ok(None);
        };

        // Guard on status so a concurrent writer cannot be overwritten.
        diesel::update(
            events::table
                .find(target.id)
                .filter(events::status.eq(EventStatus::Pending)),
        )
        .set(events::status.eq(status))
        .returning(Event::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)
    }

    pub async fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool).await?;

        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| AppError::Database {
                operation: "health check".to_string(),
                source: anyhow::Error::from(e),
            })?;
        Ok(())
    }
}
