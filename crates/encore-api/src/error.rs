//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`; any
//! `AppError` converts into `HttpAppError` and renders as a consistent
//! JSON body with the right status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use encore_core::AppError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling.
    pub code: String,
    /// Whether this error is recoverable (can be retried).
    pub recoverable: bool,
}

/// Wrapper so we can implement `IntoResponse` for the core error type
/// without violating orphan rules.
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<encore_storage::StorageError> for HttpAppError {
    fn from(err: encore_storage::StorageError) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn error_code(err: &AppError) -> &'static str {
    match err {
        AppError::Validation(_) => "INVALID_INPUT",
        AppError::Unauthorized(_) => "FORBIDDEN",
        AppError::NotFound(_) => "NOT_FOUND",
        AppError::Duplicate(_) => "DUPLICATE",
        AppError::Database(_) => "DATABASE_ERROR",
        AppError::Storage(_) => "STORAGE_ERROR",
        AppError::Media(_) => "MEDIA_ERROR",
        AppError::Internal(_) | AppError::InternalWithSource { .. } => "INTERNAL_ERROR",
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let err = &self.0;
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        } else {
            tracing::debug!(error = %err, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: err.client_message(),
            code: error_code(err).to_string(),
            recoverable: err.is_recoverable(),
        });

        (status, body).into_response()
    }
}
