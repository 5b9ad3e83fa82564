//! API error type shared by every handler.
//!
//! Errors are categorized by the HTTP status they map to. The response body
//! is always `{"message": "..."}`, with an extra `reason` field for account
//! restriction responses so clients can show why access was refused.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// The primary error type for request handling.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Validation or business-rule violation (e.g. duplicate join request).
    #[error("{0}")]
    Validation(String),

    /// Authentication failure (missing/invalid token, bad credentials).
    #[error("{0}")]
    Unauthorized(String),

    /// Authorization failure (non-member, non-admin, restricted).
    #[error("{0}")]
    Forbidden(String),

    /// The account itself is banned or suspended; the reason is echoed.
    #[error("{message}")]
    AccountRestricted {
        message: String,
        reason: Option<String>,
    },

    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Unhandled/internal failure (storage, hashing, ...).
    #[error("{0}")]
    Internal(String),
}

/// Result alias used throughout the API modules.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) | ApiError::AccountRestricted { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = match &self {
            ApiError::AccountRestricted { message, reason } => json!({
                "message": message,
                "reason": reason,
            }),
            other => json!({ "message": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("no token".into()).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("nope".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("Post").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message() {
        assert_eq!(ApiError::NotFound("Community").to_string(), "Community not found");
    }
}
