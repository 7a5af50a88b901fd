use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::types::ErrorResponse;
use crate::classifier::PredictionError;

/// Client-caused rejections of a `/predict` body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing 'text' field")]
    MissingText,
    #[error("'text' must be a string")]
    NotAString,
    #[error("'text' must not be empty")]
    EmptyText,
}

/// Everything a handler can fail with. Each variant maps to exactly one
/// status code and a single JSON error object.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("prediction failed: {0}")]
    Prediction(#[from] PredictionError),
    #[error("no route for {0}")]
    NotFound(String),
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),
    /// Anything not anticipated above; the detail is logged, never returned.
    #[error("unhandled server error: {0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Prediction(_) | Self::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message sent to the client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(reason) => reason.to_string(),
            Self::NotFound(_) => "not found".to_string(),
            Self::MethodNotAllowed(_) => "method not allowed".to_string(),
            Self::Prediction(_) => "prediction failed".to_string(),
            Self::Unhandled(_) => "server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Validation(reason) => log::debug!("Rejected request: {}", reason),
            Self::NotFound(_) | Self::MethodNotAllowed(_) => {
                log::debug!("Unrouted request: {}", self)
            }
            Self::Prediction(cause) => log::error!("Prediction failed: {}", cause),
            Self::Unhandled(detail) => log::error!("Unhandled server error: {}", detail),
        }

        let body = ErrorResponse {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
