use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid request body")]
    MalformedRequest,

    #[error("{0}")]
    Validation(ValidationError),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("This time slot is already booked. Please pick another time.")]
    SlotUnavailable,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::MissingField(_)
            | AppError::MalformedRequest
            | AppError::Validation(_)
            | AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::SlotUnavailable => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // 5xx details go to the log, not the client.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "Something went wrong. Please try again later.".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
