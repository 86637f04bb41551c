//! Error types module.
//!
//! All errors are unified under the [`AppError`] enum: domain errors
//! (`NotFound`, `Duplicate`, `Validation`, `Unauthorized`) that surface to
//! callers with a specific status, and infrastructure errors (`Database`,
//! `Storage`, `Media`, `Internal`) that surface opaquely.

use sqlx::Error as SqlxError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Media tool error: {0}")]
    Media(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("row not found".to_string()),
            SqlxError::Database(ref db) if db.is_unique_violation() => {
                AppError::Duplicate(db.message().to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation error: {}", err))
    }
}

impl AppError {
    /// HTTP status code this error maps to at the request boundary.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 403,
            AppError::NotFound(_) => 404,
            AppError::Duplicate(_) => 409,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Media(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => 500,
        }
    }

    /// Whether retrying the same request can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Storage(_)
                | AppError::Internal(_)
                | AppError::InternalWithSource { .. }
        )
    }

    /// Message safe to return to clients. Infrastructure details stay internal.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Media(_) => "Failed to process media".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::Validation(msg)
            | AppError::NotFound(msg)
            | AppError::Duplicate(msg)
            | AppError::Unauthorized(msg) => msg.clone(),
        }
    }
}
