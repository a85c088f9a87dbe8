use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nete_core::{ClientError, SyncError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unprocessable request: {0}")]
    Unprocessable(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("External dependency error: {0}")]
    External(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::Unprocessable(message.into())
    }
}

impl From<nete_core::Error> for AppError {
    fn from(error: nete_core::Error) -> Self {
        use nete_core::Error;

        match error {
            Error::NotFound(_) => Self::NotFound(error.to_string()),
            Error::RevisionMismatch { .. } => Self::Conflict(
                "Edit conflict, resource has been changed since last update".to_string(),
            ),
            Error::AlreadyExists(_) => Self::Conflict(error.to_string()),
            Error::InvalidInput(message) => Self::Unprocessable(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ClientError> for AppError {
    fn from(error: ClientError) -> Self {
        Self::External(error.to_string())
    }
}

impl From<SyncError> for AppError {
    fn from(error: SyncError) -> Self {
        match error {
            SyncError::Storage(error) => Self::Internal(error.to_string()),
            SyncError::Remote(error) => Self::External(error.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
