//! Health check DTOs for API responses.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use utoipa::ToSchema;

/// Health check response structure.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "healthy",
    "version": "0.1.0",
    "timestamp": "2024-01-01T12:00:00.000Z",
    "checks": {
        "store": {
            "status": "healthy",
            "message": "Reachable",
            "response_time_ms": 3
        },
        "scheduler": {
            "status": "healthy",
            "message": "4 trigger handles registered"
        }
    }
}))]
pub struct HealthResponse {
    /// Overall health status, the worst of all checks
    pub status: HealthStatus,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Timestamp of the health check (RFC 3339)
    #[schema(value_type = String, format = DateTime, example = "2024-01-01T12:00:00.000Z")]
    pub timestamp: String,
    pub checks: BTreeMap<String, ComponentHealth>,
}

impl HealthResponse {
    pub fn new(version: impl Into<String>, checks: BTreeMap<String, ComponentHealth>) -> Self {
        let status = checks
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            version: version.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks,
        }
    }
}

/// Ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health information.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ComponentHealth {
    #[schema(example = "healthy")]
    pub status: HealthStatus,
    #[schema(example = "Reachable")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 3)]
    pub response_time_ms: Option<u64>,
}

impl ComponentHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            response_time_ms: None,
        }
    }

    pub fn timed(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = Some(elapsed.as_millis() as u64);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }

    #[test]
    fn test_overall_status_is_worst_check() {
        let mut checks = BTreeMap::new();
        checks.insert("store".to_string(), ComponentHealth::healthy("Reachable"));
        checks.insert(
            "scheduler".to_string(),
            ComponentHealth {
                status: HealthStatus::Degraded,
                message: None,
                response_time_ms: None,
            },
        );

        let response = HealthResponse::new("0.1.0", checks);
        assert_eq!(response.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_no_checks_is_healthy() {
        let response = HealthResponse::new("0.1.0", BTreeMap::new());
        assert_eq!(response.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_timed_component_reports_millis() {
        let check = ComponentHealth::unhealthy("Connection failed: timeout")
            .timed(Duration::from_millis(42));

        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert_eq!(check.response_time_ms, Some(42));
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["response_time_ms"], 42);
    }
}
