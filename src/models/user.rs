use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

/// Job owner, read-only here; accounts are managed by the auth service
/// sharing this database.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}
