use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Malformed id: {0}")]
    MalformedId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl AppError {
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::InvalidArgument(message.into())
    }

    pub fn event_not_found() -> Self {
        AppError::NotFound("Event not found".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidArgument(_) | AppError::MalformedId(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message returned to the client. Store errors are passed through
    /// verbatim.
    pub fn public_message(&self) -> String {
        match self {
            AppError::InvalidArgument(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::MalformedId(id) => format!("Invalid event ID: {}", id),
            AppError::StoreFailure(e) => e.to_string(),
        }
    }

    fn log(&self) {
        match self {
            AppError::StoreFailure(e) => {
                error!(error = ?e, "Store failure");
            }
            _ => {
                error!(error = ?self, status = %self.status_code(), "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        error_response(self.public_message(), self.status_code())
    }
}
