use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::cron_jobs;

/// A recurring HTTP callback owned by a user.
///
/// `cron_schedule` holds the interval in minutes exactly as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = cron_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct CronJob {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub cron_schedule: String,
    pub active: bool,
    pub is_failed: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cron_jobs)]
pub struct NewCronJob {
    pub id: Uuid,
    pub title: String,
    pub url: String,
    pub cron_schedule: String,
    pub active: bool,
    pub is_failed: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl NewCronJob {
    pub fn into_job(self) -> CronJob {
        CronJob {
            id: self.id,
            title: self.title,
            url: self.url,
            cron_schedule: self.cron_schedule,
            active: self.active,
            is_failed: self.is_failed,
            user_id: self.user_id,
            created_at: self.created_at,
        }
    }
}

/// Partial update of the user-editable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = cron_jobs)]
pub struct CronJobChanges {
    pub title: Option<String>,
    pub url: Option<String>,
    pub cron_schedule: Option<String>,
}

impl CronJobChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.cron_schedule.is_none()
    }

    /// Applies the present fields to `job` in place.
    pub fn apply_to(&self, job: &mut CronJob) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(url) = &self.url {
            job.url = url.clone();
        }
        if let Some(schedule) = &self.cron_schedule {
            job.cron_schedule = schedule.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> CronJob {
        NewCronJob {
            id: Uuid::new_v4(),
            title: "ping".to_string(),
            url: "https://a.example.com".to_string(),
            cron_schedule: "5".to_string(),
            active: true,
            is_failed: false,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
        .into_job()
    }

    #[test]
    fn test_empty_changes() {
        assert!(CronJobChanges::default().is_empty());
        assert!(
            !CronJobChanges {
                url: Some("https://b.example.com".to_string()),
                ..Default::default()
            }
            .is_empty()
        );
    }

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut job = job();
        let changes = CronJobChanges {
            url: Some("https://b.example.com".to_string()),
            ..Default::default()
        };
        changes.apply_to(&mut job);

        assert_eq!(job.url, "https://b.example.com");
        assert_eq!(job.title, "ping");
        assert_eq!(job.cron_schedule, "5");
    }
}
