//! API error types and JSON error response formatting.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use triage_chat::ChatError;
use triage_core::TriageError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "unauthorized").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 401 Unauthorized - missing token or patient identity.
    Unauthorized(String),
    /// 404 Not Found.
    NotFound(String),
    /// 409 Conflict - e.g. a report requested while a switch is pending.
    Conflict(String),
    /// 500 Internal Server Error.
    Internal(String),
    /// 503 Service Unavailable - generative service failed.
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_code, message) = match self {
            ApiError::BadRequest(msg) => ("bad_request", msg),
            ApiError::Unauthorized(msg) => ("unauthorized", msg),
            ApiError::NotFound(msg) => ("not_found", msg),
            ApiError::Conflict(msg) => ("conflict", msg),
            ApiError::Internal(msg) => ("internal_error", msg),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::Config(msg) => ApiError::BadRequest(msg),
            TriageError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage failure");
                ApiError::Internal("Storage error".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Config(msg) => ApiError::Internal(msg),
            ChatError::NoPatientTurns => ApiError::BadRequest(err.to_string()),
            ChatError::ReferralPending(_) | ChatError::AlreadyReported => {
                ApiError::Conflict(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::ServiceUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_chat_error_mapping() {
        assert!(matches!(
            ApiError::from(ChatError::NoPatientTurns),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ChatError::ReferralPending("eye".into())),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn test_storage_error_hides_details() {
        let err = ApiError::from(TriageError::Storage("disk I/O error at /secret".into()));
        match err {
            ApiError::Internal(msg) => assert_eq!(msg, "Storage error"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
