//! Error types for coach-fb
//!
//! Every handler failure becomes `{"error": {"code", "message"}}` with a
//! status derived from the error kind.

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. report requested before completion
    #[error("Conflict: {0}")]
    Conflict(String),

    /// coach-common error; status depends on the variant
    #[error(transparent)]
    Common(#[from] coach_common::Error),
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        use coach_common::Error as CommonError;

        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Common(err) => match err {
                CommonError::SessionNotFound(_) => {
                    (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", err.to_string())
                }
                CommonError::MalformedInput(_) => {
                    (StatusCode::BAD_REQUEST, "MALFORMED_INPUT", err.to_string())
                }
                ref e if e.is_persistence_failure() => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    err.to_string(),
                ),
                CommonError::Io(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", err.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", err.to_string()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
