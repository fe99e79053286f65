use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::schema::events;

/// Lifecycle of a single firing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, DbEnum, ToSchema)]
#[db_enum(existing_type_path = "crate::schema::sql_types::EventStatus")]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    /// Scheduled, not fired yet
    Pending,
    Success,
    Failure,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Pending => write!(f, "PENDING"),
            EventStatus::Success => write!(f, "SUCCESS"),
            EventStatus::Failure => write!(f, "FAILURE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Serialize)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub cron_job_id: Uuid,
    pub time: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub struct NewEvent {
    pub id: Uuid,
    pub cron_job_id: Uuid,
    pub time: DateTime<Utc>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

impl NewEvent {
    /// A PENDING record for a future firing
    pub fn pending(cron_job_id: Uuid, time: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            cron_job_id,
            time,
            status: EventStatus::Pending,
            created_at,
        }
    }

    pub fn into_event(self) -> Event {
        Event {
            id: self.id,
            cron_job_id: self.cron_job_id,
            time: self.time,
            status: self.status,
            created_at: self.created_at,
        }
    }
}
