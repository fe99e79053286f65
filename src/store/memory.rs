//! In-memory store.
//!
//! Thread-safe, process-local backend used by tests and `backend = "memory"`
//! runs. Data is not persisted across restarts.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Store, nearest_event};
use crate::error::{AppError, AppResult};
use crate::models::{CronJob, CronJobChanges, Event, EventStatus, NewCronJob, NewEvent, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, CronJob>,
    events: HashMap<Uuid, Event>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_next_delete: AtomicBool,
}

fn poisoned() -> AppError {
    AppError::Internal {
        source: anyhow::anyhow!("memory store lock poisoned"),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user; accounts are otherwise read-only to this service.
    pub fn add_user(&self, username: &str, email: &str) -> AppResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .map_err(|_| poisoned())?
            .users
            .insert(user.id, user.clone());
        Ok(user)
    }

    /// Makes the next `delete_job_with_events` fail after its events were
    /// removed but before the job row is.
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> AppResult<T> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        Ok(f(&tables))
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> AppResult<T>) -> AppResult<T> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        f(&mut tables)
    }

    fn with_job<T>(&self, job_id: Uuid, f: impl FnOnce(&mut CronJob) -> T) -> AppResult<T> {
        self.write(|tables| {
            tables
                .jobs
                .get_mut(&job_id)
                .map(f)
                .ok_or_else(|| AppError::job_not_found(job_id))
        })
    }
}

fn is_pending_for(event: &Event, job_id: Uuid) -> bool {
    event.cron_job_id == job_id && event.status == EventStatus::Pending
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.read(|tables| tables.users.get(&user_id).cloned())
    }

    async fn insert_job(&self, job: NewCronJob) -> AppResult<CronJob> {
        self.write(|tables| {
            if !tables.users.contains_key(&job.user_id) {
                return Err(AppError::Validation {
                    field: "user_id".to_string(),
                    reason: "Referenced record does not exist".to_string(),
                });
            }
            let job = job.into_job();
            tables.jobs.insert(job.id, job.clone());
            Ok(job)
        })
    }

    async fn find_job(&self, job_id: Uuid) -> AppResult<Option<CronJob>> {
        self.read(|tables| tables.jobs.get(&job_id).cloned())
    }

    async fn update_job(&self, job_id: Uuid, changes: CronJobChanges) -> AppResult<CronJob> {
        self.with_job(job_id, |job| {
            changes.apply_to(job);
            job.clone()
        })
    }

    async fn set_active(&self, job_id: Uuid, active: bool) -> AppResult<()> {
        self.with_job(job_id, |job| job.active = active)
    }

    async fn set_failed(&self, job_id: Uuid, failed: bool) -> AppResult<()> {
        self.with_job(job_id, |job| job.is_failed = failed)
    }

    async fn list_active_jobs(&self) -> AppResult<Vec<CronJob>> {
        self.read(|tables| {
            let mut jobs: Vec<_> = tables.jobs.values().filter(|j| j.active).cloned().collect();
            jobs.sort_by_key(|j| j.created_at);
            jobs
        })
    }

    async fn delete_job_with_events(&self, job_id: Uuid) -> AppResult<()> {
        self.write(|tables| {
            // Set the job's events aside so a failed step can put them back.
            let removed: Vec<(Uuid, Event)> = tables
                .events
                .iter()
                .filter(|(_, event)| event.cron_job_id == job_id)
                .map(|(id, event)| (*id, event.clone()))
                .collect();
            tables.events.retain(|_, event| event.cron_job_id != job_id);

            let outcome = if self.fail_next_delete.swap(false, Ordering::SeqCst) {
                Err(AppError::Database {
                    operation: "delete cron job".to_string(),
                    source: anyhow::anyhow!("injected failure"),
                })
            } else {
                tables
                    .jobs
                    .remove(&job_id)
                    .map(|_| ())
                    .ok_or_else(|| AppError::job_not_found(job_id))
            };

            if outcome.is_err() {
                tables.events.extend(removed);
            }
            outcome
        })
    }

    async fn insert_events(&self, events: Vec<NewEvent>) -> AppResult<()> {
        self.write(|tables| {
            for event in events {
                let event = event.into_event();
                tables.events.insert(event.id, event);
            }
            Ok(())
        })
    }

    async fn count_pending(&self, job_id: Uuid) -> AppResult<usize> {
        self.read(|tables| {
            tables
                .events
                .values()
                .filter(|e| is_pending_for(e, job_id))
                .count()
        })
    }

    async fn list_events(&self, job_id: Uuid) -> AppResult<Vec<Event>> {
        self.read(|tables| {
            let mut events: Vec<_> = tables
                .events
                .values()
                .filter(|e| e.cron_job_id == job_id)
                .cloned()
                .collect();
            events.sort_by(|a, b| b.time.cmp(&a.time));
            events
        })
    }

    async fn delete_pending(&self, job_id: Uuid) -> AppResult<usize> {
        self.write(|tables| {
            let before = tables.events.len();
            tables.events.retain(|_, e| !is_pending_for(e, job_id));
            Ok(before - tables.events.len())
        })
    }

    async fn delete_pending_before(&self, job_id: Uuid, cutoff: DateTime<Utc>) -> AppResult<usize> {
        self.write(|tables| {
            let before = tables.events.len();
            tables
                .events
                .retain(|_, e| !(is_pending_for(e, job_id) && e.time < cutoff));
            Ok(before - tables.events.len())
        })
    }

    async fn mark_nearest_pending(
        &self,
        job_id: Uuid,
        fired_at: DateTime<Utc>,
        status: EventStatus,
    ) -> AppResult<Option<Event>> {
        self.write(|tables| {
            let target = nearest_event(
                tables.events.values().filter(|e| is_pending_for(e, job_id)),
                fired_at,
            )
            .map(|e| e.id);

            Ok(target.and_then(|id| {
                tables.events.get_mut(&id).map(|event| {
                    event.status = status;
                    event.clone()
                })
            }))
        })
    }

    async fn ping(&self) -> AppResult<()> {
        self.read(|_| ())
    }
}
