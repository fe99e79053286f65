//! Per-job execution records and the lookahead window.
//!
//! An active job keeps `lookahead` PENDING events in the future. Seeding
//! fills the window on create/enable; every firing marks one event and tops
//! the window back up.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::jobs::clock::Clock;
use crate::jobs::error::JobError;
use crate::jobs::trigger::{ScheduleDescriptor, next_fire_times};
use crate::models::{Event, EventStatus, NewEvent};
use crate::store::Store;

pub struct EventLedger {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    lookahead: usize,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl EventLedger {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, lookahead: usize) -> Self {
        Self {
            store,
            clock,
            lookahead: lookahead.max(1),
            locks: DashMap::new(),
        }
    }

    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn lock_for(&self, job_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(job_id).or_default().value())
    }

    /// Computes `count` PENDING events from now without touching the store.
    ///
    /// Every fire time must be strictly after now, otherwise the schedule is
    /// rejected.
    pub fn plan(
        &self,
        job_id: Uuid,
        descriptor: &ScheduleDescriptor,
        count: usize,
    ) -> AppResult<Vec<NewEvent>> {
        let now = self.clock.now();
        let times = next_fire_times(descriptor, now, count)?;

        if let Some(stale) = times.iter().find(|time| **time <= now) {
            return Err(JobError::NonFutureFireTime {
                fire_time: stale.to_rfc3339(),
                now: now.to_rfc3339(),
            }
            .into());
        }

        Ok(times
            .into_iter()
            .map(|time| NewEvent::pending(job_id, time, now))
            .collect())
    }

    /// Inserts planned events in one store call.
    pub async fn record(&self, events: Vec<NewEvent>) -> AppResult<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.store.insert_events(events).await
    }

    /// Fills the lookahead window from scratch.
    pub async fn seed(&self, job_id: Uuid, descriptor: &ScheduleDescriptor) -> AppResult<usize> {
        let events = self.plan(job_id, descriptor, self.lookahead)?;
        let seeded = events.len();
        self.record(events).await?;

        tracing::debug!(job_id = %job_id, seeded, "Seeded pending events");
        Ok(seeded)
    }

    /// Appends the missing fire times so the window is full again.
    ///
    /// With one event left only the second-next time is added; with none
    /// both are. Serialised per job so overlapping firings cannot both insert.
    pub async fn top_up(&self, job_id: Uuid, descriptor: &ScheduleDescriptor) -> AppResult<usize> {
        let lock = self.lock_for(job_id);
        let _guard = lock.lock().await;

        let pending = self.store.count_pending(job_id).await?;
        if pending >= self.lookahead {
            return Ok(0);
        }

        let events: Vec<NewEvent> = self
            .plan(job_id, descriptor, self.lookahead)?
            .into_iter()
            .skip(pending)
            .collect();
        let added = events.len();
        self.record(events).await?;

        tracing::debug!(job_id = %job_id, pending, added, "Topped up pending events");
        Ok(added)
    }

    pub async fn purge_pending(&self, job_id: Uuid) -> AppResult<usize> {
        let lock = self.lock_for(job_id);
        let _guard = lock.lock().await;
        self.store.delete_pending(job_id).await
    }

    /// Drops PENDING events that are already in the past.
    pub async fn purge_pending_before(
        &self,
        job_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> AppResult<usize> {
        let lock = self.lock_for(job_id);
        let _guard = lock.lock().await;
        self.store.delete_pending_before(job_id, cutoff).await
    }

    /// Marks the PENDING event nearest `fired_at`.
    pub async fn mark_outcome(
        &self,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        status: EventStatus,
    ) -> AppResult<Option<Event>> {
        let lock = self.lock_for(job_id);
        let _guard = lock.lock().await;

        let marked = self
            .store
            .mark_nearest_pending(job_id, fired_at, status)
            .await?;
        match &marked {
            Some(event) => {
                tracing::debug!(job_id = %job_id, event_id = %event.id, status = %status, "Marked event")
            }
            None => {
                tracing::warn!(job_id = %job_id, fired_at = %fired_at, "No pending event to mark")
            }
        }
        Ok(marked)
    }

    /// A job's events, newest firing first.
    pub async fn history(&self, job_id: Uuid) -> AppResult<Vec<Event>> {
        self.store.list_events(job_id).await
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Releases the job's lock entry once the job is gone.
    pub fn forget(&self, job_id: Uuid) {
        self.locks.remove(&job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::clock::ManualClock;
    use crate::models::NewCronJob;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn midnight() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    async fn setup() -> (Arc<MemoryStore>, Arc<ManualClock>, EventLedger, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(midnight()));
        let user = store.add_user("ada", "ada@example.com").unwrap();
        let job = store
            .insert_job(NewCronJob {
                id: Uuid::new_v4(),
                title: "ping".to_string(),
                url: "https://a.example.com".to_string(),
                cron_schedule: "5".to_string(),
                active: true,
                is_failed: false,
                user_id: user.id,
                created_at: midnight(),
            })
            .await
            .unwrap();
        let ledger = EventLedger::new(store.clone(), clock.clone(), 2);
        (store, clock, ledger, job.id)
    }

    fn five() -> ScheduleDescriptor {
        "5".parse().unwrap()
    }

    async fn pending_times(ledger: &EventLedger, job_id: Uuid) -> Vec<DateTime<Utc>> {
        let mut times: Vec<_> = ledger
            .history(job_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.status == EventStatus::Pending)
            .map(|e| e.time)
            .collect();
        times.sort();
        times
    }

    #[tokio::test]
    async fn test_seed_from_midnight() {
        let (_, _, ledger, job_id) = setup().await;

        assert_eq!(ledger.seed(job_id, &five()).await.unwrap(), 2);
        assert_eq!(
            pending_times(&ledger, job_id).await,
            vec![midnight() + Duration::minutes(5), midnight() + Duration::minutes(10)]
        );
    }

    #[tokio::test]
    async fn test_plan_has_no_side_effects() {
        let (store, _, ledger, job_id) = setup().await;

        let planned = ledger.plan(job_id, &five(), 2).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(store.count_pending(job_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_top_up_with_one_left_adds_second_next() {
        let (store, clock, ledger, job_id) = setup().await;
        ledger.seed(job_id, &five()).await.unwrap();

        clock.set(midnight() + Duration::minutes(5));
        ledger
            .mark_outcome(job_id, clock.now(), EventStatus::Success)
            .await
            .unwrap();
        assert_eq!(store.count_pending(job_id).await.unwrap(), 1);

        assert_eq!(ledger.top_up(job_id, &five()).await.unwrap(), 1);
        assert_eq!(
            pending_times(&ledger, job_id).await,
            vec![midnight() + Duration::minutes(10), midnight() + Duration::minutes(15)]
        );
    }

    #[tokio::test]
    async fn test_top_up_with_none_left_adds_two() {
        let (_, clock, ledger, job_id) = setup().await;
        clock.set(midnight() + Duration::seconds(30));

        assert_eq!(ledger.top_up(job_id, &five()).await.unwrap(), 2);
        assert_eq!(ledger.top_up(job_id, &five()).await.unwrap(), 0);
        assert_eq!(pending_times(&ledger, job_id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_top_ups_do_not_overfill() {
        let (store, _, ledger, job_id) = setup().await;
        let ledger = Arc::new(ledger);

        let a = tokio::spawn({
            let ledger = Arc::clone(&ledger);
            async move { ledger.top_up(job_id, &five()).await }
        });
        let b = tokio::spawn({
            let ledger = Arc::clone(&ledger);
            async move { ledger.top_up(job_id, &five()).await }
        });
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(store.count_pending(job_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_outcome_without_pending_is_noop() {
        let (_, _, ledger, job_id) = setup().await;
        let marked = ledger
            .mark_outcome(job_id, midnight(), EventStatus::Failure)
            .await
            .unwrap();
        assert!(marked.is_none());
    }

    #[tokio::test]
    async fn test_purge_pending_keeps_history() {
        let (_, clock, ledger, job_id) = setup().await;
        ledger.seed(job_id, &five()).await.unwrap();
        clock.set(midnight() + Duration::minutes(5));
        ledger
            .mark_outcome(job_id, clock.now(), EventStatus::Success)
            .await
            .unwrap();

        assert_eq!(ledger.purge_pending(job_id).await.unwrap(), 1);
        let history = ledger.history(job_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, EventStatus::Success);
    }

    #[tokio::test]
    async fn test_purge_pending_before_cutoff() {
        let (_, clock, ledger, job_id) = setup().await;
        ledger.seed(job_id, &five()).await.unwrap();

        clock.set(midnight() + Duration::minutes(7));
        let removed = ledger.purge_pending_before(job_id, clock.now()).await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(
            pending_times(&ledger, job_id).await,
            vec![midnight() + Duration::minutes(10)]
        );
    }
}
