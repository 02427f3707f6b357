use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::types::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The session already left triage (summary or diagnosis recorded).
    #[error("Session {0} is completed")]
    SessionCompleted(Uuid),

    #[error("Decision service error: {0}")]
    Decision(String),

    /// The decision named a doctor that is not in the directory.
    #[error("Invalid doctor: {0}")]
    InvalidDoctor(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    None,
                )
            }
            AppError::NotFound(ref msg) => (StatusCode::NOT_FOUND, msg.clone(), None),
            AppError::Validation(ref msg) => (
                StatusCode::BAD_REQUEST,
                msg.clone(),
                Some(vec![msg.clone()]),
            ),
            AppError::BadRequest(ref msg) => (StatusCode::BAD_REQUEST, msg.clone(), None),
            AppError::Unauthorized(ref msg) => (StatusCode::UNAUTHORIZED, msg.clone(), None),
            AppError::Conflict(ref msg) => (StatusCode::CONFLICT, msg.clone(), None),
            AppError::SessionCompleted(_) => (StatusCode::CONFLICT, self.to_string(), None),
            AppError::Decision(ref msg) => {
                tracing::error!("Decision service error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "Triage assistant is unavailable".to_string(),
                    None,
                )
            }
            AppError::InvalidDoctor(ref msg) => {
                tracing::error!("Decision referenced an unknown doctor: {}", msg);
                (StatusCode::BAD_GATEWAY, self.to_string(), None)
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
        };

        let body = Json(ApiResponse::<()>::error(Some(message), errors));

        (status, body).into_response()
    }
}

/// Maps a unique-index violation to `Conflict`, a dangling reference to
/// `NotFound`, everything else to `Database`.
pub fn map_write_error(e: sqlx::Error, conflict_message: &str, missing_message: &str) -> AppError {
    let (is_unique_violation, is_foreign_key_violation) =
        e.as_database_error().map_or((false, false), |db| {
            (db.is_unique_violation(), db.is_foreign_key_violation())
        });

    if is_unique_violation {
        tracing::warn!("{}: {:?}", conflict_message, e);
        AppError::Conflict(conflict_message.to_string())
    } else if is_foreign_key_violation {
        tracing::warn!("{}: {:?}", missing_message, e);
        AppError::NotFound(missing_message.to_string())
    } else {
        tracing::error!("Database write failed: {:?}", e);
        AppError::Database(e)
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
