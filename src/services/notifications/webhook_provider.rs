//! Webhook relay provider.
//!
//! Posts alert messages as JSON to a relay (mail gateway, chat webhook)
//! using the shared `HTTP_CLIENT`.

use super::provider::{Delivery, NotificationMessage, NotificationProvider};
use crate::config::AlertsConfig;
use crate::error::AppResult;
use crate::external::HTTP_CLIENT;
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub struct WebhookProvider {
    url: String,
    token: Option<String>,
    timeout: Duration,
}

impl WebhookProvider {
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            token: token.filter(|t| !t.is_empty()),
            timeout,
        }
    }

    /// Builds the provider from `[alerts]`; `None` when no relay is configured.
    pub fn from_config(config: &AlertsConfig) -> Option<Self> {
        config.is_enabled().then(|| {
            Self::new(
                config.webhook_url.clone(),
                Some(config.webhook_token.clone()),
                Duration::from_secs(config.timeout_secs),
            )
        })
    }
}

#[async_trait]
impl NotificationProvider for WebhookProvider {
    async fn deliver(&self, message: &NotificationMessage) -> AppResult<Delivery> {
        let start = Instant::now();

        let mut request = HTTP_CLIENT.post(&self.url).timeout(self.timeout).json(message);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let delivery = match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                Delivery {
                    accepted: status.is_success(),
                    status_code: Some(status.as_u16()),
                    detail: resp.text().await.ok().filter(|body| !body.is_empty()),
                    elapsed: start.elapsed(),
                }
            }
            Err(e) => Delivery {
                accepted: false,
                status_code: None,
                detail: Some(e.to_string()),
                elapsed: start.elapsed(),
            },
        };

        tracing::debug!(
            url = %self.url,
            accepted = delivery.accepted,
            status = ?delivery.status_code,
            "Alert relay answered"
        );
        Ok(delivery)
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message(job_id: Uuid) -> NotificationMessage {
        NotificationMessage {
            recipient: Some("ada@example.com".to_string()),
            subject: "Cronjob Failure Alert".to_string(),
            body: "failed".to_string(),
            job_id,
            url: "https://a.example.com/hook".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deliver_posts_json_with_token() {
        let job_id = Uuid::new_v4();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/alerts"))
            .and(header("authorization", "Bearer s3cret"))
            .and(body_partial_json(json!({
                "to": "ada@example.com",
                "subject": "Cronjob Failure Alert",
                "jobId": job_id,
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let provider = WebhookProvider::new(
            format!("{}/alerts", server.uri()),
            Some("s3cret".to_string()),
            Duration::from_secs(2),
        );
        let delivery = provider.deliver(&message(job_id)).await.unwrap();

        assert!(delivery.accepted);
        assert_eq!(delivery.status_code, Some(202));
    }

    #[tokio::test]
    async fn test_relay_error_is_unaccepted_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("relay down"))
            .mount(&server)
            .await;

        let provider = WebhookProvider::new(server.uri(), None, Duration::from_secs(2));
        let delivery = provider.deliver(&message(Uuid::new_v4())).await.unwrap();

        assert!(!delivery.accepted);
        assert_eq!(delivery.status_code, Some(500));
        assert_eq!(delivery.detail.as_deref(), Some("relay down"));
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_unaccepted_delivery() {
        let provider = WebhookProvider::new("http://127.0.0.1:1", None, Duration::from_secs(2));
        let delivery = provider.deliver(&message(Uuid::new_v4())).await.unwrap();

        assert!(!delivery.accepted);
        assert!(delivery.status_code.is_none());
    }

    #[test]
    fn test_from_config_requires_url() {
        assert!(WebhookProvider::from_config(&AlertsConfig::default()).is_none());

        let config = AlertsConfig {
            webhook_url: "https://relay.example.com".to_string(),
            ..Default::default()
        };
        let provider = WebhookProvider::from_config(&config).unwrap();
        assert!(provider.token.is_none());
    }
}
