use crate::services::storage_service::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// A lightweight wrapper for request-level failures that keeps the message
/// local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // The public surface of this service is plain text, errors included.
        (self.status, self.message).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ContentTooLarge { .. } => {
                AppError::new(StatusCode::BAD_REQUEST, "Content is too large")
            }
            StorageError::InvalidKey => AppError::new(StatusCode::BAD_REQUEST, "Invalid key"),
            StorageError::PasteNotFound(_) => AppError::new(StatusCode::NOT_FOUND, "Not found"),
            StorageError::Unauthorized(_) => {
                AppError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
            }
            other => AppError::internal(other.to_string()),
        }
    }
}
