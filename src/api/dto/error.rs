//! Error response DTOs.

use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

/// Standard error response format.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "code": "INVALID_SCHEDULE",
    "message": "Invalid schedule '0': interval must be a positive integer number of minutes",
    "request_id": "5f0c6a0e-8d1e-4a43-9a4b-0c2b8f0f4c1d"
}))]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// Creates a new error response with code and message.
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
            request_id: None,
        }
    }

    pub fn not_found_error(entity: &str, field: &str, value: &str) -> Self {
        Self::new("NOT_FOUND", &format!("{} not found", entity)).with_details(json!({
            "entity": entity,
            "field": field,
            "value": value,
        }))
    }

    pub fn validation_error(field: &str, reason: &str) -> Self {
        Self::new("VALIDATION_ERROR", reason).with_details(json!({ "field": field }))
    }

    /// Adds details to the error response.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Adds request ID to the error response for correlation.
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_are_skipped() {
        let json = serde_json::to_value(ErrorResponse::new("BAD_REQUEST", "nope")).unwrap();
        assert_eq!(json, json!({ "code": "BAD_REQUEST", "message": "nope" }));
    }

    #[test]
    fn test_not_found_details() {
        let response = ErrorResponse::not_found_error("cron_job", "id", "42").with_request_id("r-1");
        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["details"]["entity"], "cron_job");
        assert_eq!(json["request_id"], "r-1");
    }
}
