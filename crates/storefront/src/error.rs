//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures unexpected errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! The taxonomy mirrors how the order engine fails: business-rule
//! conflicts (out-of-stock at checkout) and not-founds are expected and
//! surfaced with their message; database and internal failures are hidden
//! behind a generic 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Malformed input, rejected before any transaction started.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Business-rule conflict (e.g. selected size out of stock).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated (or not allowed to know more).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but this action is not permitted.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Unavailable => Self::Conflict(err.to_string()),
            CheckoutError::Validation(message) => Self::Validation(message),
            CheckoutError::Repository(inner) => Self::Repository(inner),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Repository(
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_)
            ) | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => "Not found".to_owned(),
                RepositoryError::Conflict(message) => message.clone(),
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "Something went wrong, please try again later".to_owned()
                }
            },
            Self::Internal(_) => "Something went wrong, please try again later".to_owned(),
            Self::Validation(message)
            | Self::Conflict(message)
            | Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message) => message.clone(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status_of(AppError::Validation("bad input".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::Conflict("out of stock".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::NotFound("no such order".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("Unauthorized".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("nope".to_owned())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_checkout_conflict_maps_to_409() {
        let err = AppError::from(CheckoutError::Unavailable);
        assert_eq!(status_of(err), StatusCode::CONFLICT);
    }

    #[test]
    fn test_display_keeps_internal_detail_for_logs() {
        let err = AppError::Repository(RepositoryError::DataCorruption(
            "invalid events json in row 42".to_owned(),
        ));
        assert!(err.to_string().contains("invalid events json"));
    }
}
