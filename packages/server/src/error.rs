use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;
use storage::{StorageError, SweepError};

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `TOKEN_MISSING`, `TOKEN_INVALID`, `PERMISSION_DENIED`, `NOT_FOUND`,
    /// `PAYLOAD_TOO_LARGE`, `UNSUPPORTED_TYPE`, `CORRUPT_DATA`,
    /// `STORAGE_WRITE_FAILED`, `SWEEP_IN_PROGRESS`, `INTERNAL_ERROR`.
    #[schema(example = "UNSUPPORTED_TYPE")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "unsupported content type: application/zip")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    Forbidden,
    NotFound(String),
    PayloadTooLarge(String),
    UnsupportedType(String),
    CorruptData(String),
    StorageWriteFailed(String),
    SweepInProgress,
    Internal(String),
}

impl AppError {
    pub(crate) fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "You do not have access to this record".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::UnsupportedType(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "UNSUPPORTED_TYPE",
                    message: msg,
                },
            ),
            AppError::CorruptData(msg) => {
                tracing::error!("Corrupt stored data: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "CORRUPT_DATA",
                        message: "Stored file data could not be read".into(),
                    },
                )
            }
            AppError::StorageWriteFailed(msg) => {
                tracing::error!("Storage write failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORAGE_WRITE_FAILED",
                        message: "Failed to store the uploaded file".into(),
                    },
                )
            }
            AppError::SweepInProgress => (
                StatusCode::CONFLICT,
                ErrorBody {
                    code: "SWEEP_IN_PROGRESS",
                    message: "A sweep is already running".into(),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            StorageError::UnsupportedType(_) => AppError::UnsupportedType(err.to_string()),
            StorageError::NotFound(_) => AppError::NotFound("File not found".into()),
            StorageError::CorruptData(detail) => AppError::CorruptData(detail),
            StorageError::StorageWriteFailed(detail) => AppError::StorageWriteFailed(detail),
            StorageError::Io(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<SweepError> for AppError {
    fn from(err: SweepError) -> Self {
        match err {
            SweepError::InProgress => AppError::SweepInProgress,
            SweepError::Storage(e) => e.into(),
        }
    }
}
