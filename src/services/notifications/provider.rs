//! Delivery channel seam for failure alerts.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;

/// An alert in the shape a relay receives it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Owner's email, absent when the user lookup failed
    #[serde(rename = "to")]
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub job_id: Uuid,
    pub url: String,
}

/// What the channel reported back.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub accepted: bool,
    pub status_code: Option<u16>,
    /// Response body or transport error
    pub detail: Option<String>,
    pub elapsed: Duration,
}

#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Hands one message to the channel. Transport failures come back as an
    /// unaccepted `Delivery`, not as `Err`.
    async fn deliver(&self, message: &NotificationMessage) -> AppResult<Delivery>;

    fn name(&self) -> &'static str;
}
