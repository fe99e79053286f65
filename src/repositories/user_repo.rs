//! User repository for async database operations.
//!
//! Users are owned by the auth service; this repository only reads them.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::checkout;
use crate::db::AsyncDbPool;
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::schema::users;

#[derive(Clone)]
pub struct UserRepository {
    pool: AsyncDbPool,
}

impl UserRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    /// Finds a user by id.
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn find_by_id(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let mut conn = checkout(&self.pool).await?;

        users::table
            .find(user_id)
            .select(User::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }
}
