//! Axum-specific error types and mappings.
//!
//! This module maps [`ytd_core::CoreError`], the closed error taxonomy shared
//! with job records, onto HTTP status codes and a stable JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use ytd_core::CoreError;

/// Axum-specific error type. Wraps [`CoreError`] and adds the admission-layer
/// failures (auth, rate limiting) that never reach the engine.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("request body exceeded the configured size limit")]
    PayloadTooLarge,

    #[error("malformed request: {0}")]
    BadRequest(String),
}

/// JSON error response body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl HttpError {
    fn status_and_parts(&self) -> (StatusCode, String, String) {
        match self {
            Self::Core(err) => {
                let status = StatusCode::from_u16(err.http_status())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, err.code().to_string(), err.to_string())
            }
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE".to_string(),
                self.to_string(),
            ),
            Self::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION".to_string(),
                self.to_string(),
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.status_and_parts();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Picked up by whichever `http_request` span (routes.rs) is
            // ambient for this request, which carries the request id (§7).
            tracing::error!(code = %code, message = %message, "internal server error");
        }
        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = HttpError::Core(CoreError::NotFound("x".into()));
        let (status, code, _) = err.status_and_parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn queue_full_maps_to_its_configured_status() {
        let err = HttpError::Core(CoreError::QueueFull);
        let (status, _, _) = err.status_and_parts();
        assert_eq!(status.as_u16(), CoreError::QueueFull.http_status());
    }
}
