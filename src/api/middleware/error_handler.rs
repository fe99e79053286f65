//! Error handler for converting AppError to HTTP responses.
//!
//! Every error leaves the API as an [`ErrorResponse`] JSON body. Internal
//! details (database operations, wrapped sources) are logged, not returned.

use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Maps an AppError variant to its HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Validation { .. } => StatusCode::BAD_REQUEST,
        AppError::InvalidSchedule { .. } => StatusCode::BAD_REQUEST,
        AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AppError::Probe { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Validation { .. } => "VALIDATION_ERROR",
        AppError::InvalidSchedule { .. } => "INVALID_SCHEDULE",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Unauthorized { .. } => "UNAUTHORIZED",
        AppError::Probe { failure, .. } => failure.code(),
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

fn error_body(error: &AppError) -> ErrorResponse {
    let code = error_to_code(error);
    match error {
        AppError::NotFound {
            entity,
            field,
            value,
        } => ErrorResponse::not_found_error(entity, field, value),
        AppError::Validation { field, reason } => ErrorResponse::validation_error(field, reason),
        AppError::InvalidSchedule { schedule, reason } => {
            ErrorResponse::new(code, &error.to_string()).with_details(json!({
                "schedule": schedule,
                "reason": reason,
            }))
        }
        AppError::BadRequest { message } | AppError::Unauthorized { message } => {
            ErrorResponse::new(code, message)
        }
        AppError::Probe { url, failure } => {
            let message = match failure {
                crate::jobs::ProbeFailure::Forbidden => {
                    "The target rejected the request, check its CORS settings"
                }
                crate::jobs::ProbeFailure::NoResponse { .. } => "The target did not respond",
                crate::jobs::ProbeFailure::Failed { .. } => "The target could not be reached",
            };
            ErrorResponse::new(code, message).with_details(json!({
                "url": url,
                "reason": failure.to_string(),
            }))
        }
        AppError::Database { operation, .. } => ErrorResponse::new(
            code,
            &format!("Database operation failed: {}", operation),
        ),
        AppError::ConnectionPool { .. } => {
            ErrorResponse::new(code, "Database connection unavailable")
        }
        AppError::Internal { .. } => ErrorResponse::new(code, "An internal error occurred"),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        let body = error_body(&self);

        if status.is_server_error() {
            tracing::error!(error = ?self, code = %body.code, "Request failed");
        } else {
            tracing::debug!(error = %self, code = %body.code, "Request rejected");
        }

        let mut response = (status, Json(body.clone())).into_response();
        // Picked up by `global_error_handler` to attach the request id
        response.extensions_mut().insert(body);
        response
    }
}

/// Builds an error response that carries the request id.
pub fn error_to_response_with_request_id(error: AppError, request_id: Option<String>) -> Response {
    let status = error_to_status_code(&error);
    let mut body = error_body(&error);
    if let Some(id) = request_id {
        body = body.with_request_id(&id);
    }
    (status, Json(body)).into_response()
}

fn fallback_body(status: StatusCode) -> ErrorResponse {
    let (code, message) = match status {
        StatusCode::NOT_FOUND => ("NOT_FOUND", "The requested resource was not found"),
        StatusCode::METHOD_NOT_ALLOWED => (
            "METHOD_NOT_ALLOWED",
            "HTTP method not allowed for this endpoint",
        ),
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Unsupported media type"),
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "Request timeout"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request payload too large"),
        StatusCode::SERVICE_UNAVAILABLE => ("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
        s if s.is_server_error() => ("INTERNAL_ERROR", "An internal server error occurred"),
        _ => ("BAD_REQUEST", "Bad request - invalid or malformed request"),
    };
    ErrorResponse::new(code, message)
}

/// Normalises every error response to the [`ErrorResponse`] shape and
/// stamps it with the request id.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().map(|r| r.0.clone());
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let body = match response.extensions().get::<ErrorResponse>() {
        Some(body) => body.clone(),
        None => {
            let is_json = response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("application/json"));
            if is_json {
                return response;
            }
            fallback_body(status)
        }
    };

    let body = match &request_id {
        Some(id) => body.with_request_id(id),
        None => body,
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    let mut rebuilt = (status, Json(body)).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE {
            rebuilt.headers_mut().insert(name.clone(), value.clone());
        }
    }
    rebuilt
}
