//! Failure alerts for jobs whose retries ran out.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::provider::{NotificationMessage, NotificationProvider};
use crate::error::{AppError, AppResult};

pub const ALERT_SUBJECT: &str = "Cronjob Failure Alert";

/// One job's failure, addressed to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureAlert {
    pub job_id: Uuid,
    pub title: String,
    pub url: String,
    pub recipient: Option<String>,
}

impl FailureAlert {
    pub fn body(&self) -> String {
        format!(
            "Cronjob {} has failed. Try Disable and Re-enable the cronjob. It may resolve the issue.",
            self.title
        )
    }

    pub fn to_message(&self) -> NotificationMessage {
        NotificationMessage {
            recipient: self.recipient.clone(),
            subject: ALERT_SUBJECT.to_string(),
            body: self.body(),
            job_id: self.job_id,
            url: self.url.clone(),
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send_failure_alert(&self, alert: &FailureAlert) -> AppResult<()>;
}

/// Delivers alerts through the configured provider, or logs them when none
/// is configured.
#[derive(Clone, Default)]
pub struct NotificationService {
    provider: Option<Arc<dyn NotificationProvider>>,
}

impl NotificationService {
    pub fn new(provider: Option<Arc<dyn NotificationProvider>>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.as_ref().map_or("log", |p| p.name())
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn send_failure_alert(&self, alert: &FailureAlert) -> AppResult<()> {
        let Some(provider) = &self.provider else {
            tracing::warn!(
                job_id = %alert.job_id,
                recipient = alert.recipient.as_deref().unwrap_or("-"),
                subject = ALERT_SUBJECT,
                body = %alert.body(),
                "Failure alert (no relay configured)"
            );
            return Ok(());
        };

        let delivery = provider.deliver(&alert.to_message()).await?;
        if !delivery.accepted {
            return Err(AppError::Internal {
                source: anyhow::anyhow!(
                    "{} relay rejected alert (status {:?}): {}",
                    provider.name(),
                    delivery.status_code,
                    delivery.detail.unwrap_or_default()
                ),
            });
        }

        tracing::info!(
            job_id = %alert.job_id,
            provider = provider.name(),
            elapsed_ms = delivery.elapsed.as_millis() as u64,
            "Failure alert delivered"
        );
        Ok(())
    }
}
