//! Failure alerts with pluggable providers.
//!
//! `NotificationSink` is what the executor talks to. `NotificationService`
//! implements it on top of a `NotificationProvider` (webhook relay) and falls
//! back to a WARN log line when no relay is configured.

mod provider;
mod webhook_provider;

pub mod notification_service;

pub use notification_service::{ALERT_SUBJECT, FailureAlert, NotificationService, NotificationSink};
pub use provider::{Delivery, NotificationMessage, NotificationProvider};
pub use webhook_provider::WebhookProvider;
