//! Request errors and their HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

/// Reasons a webhook request is rejected.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Unsupported media type; send application/json")]
    UnsupportedMediaType,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid JSON format")]
    InvalidJson(#[source] serde_json::Error),

    #[error("JSON object required")]
    NotAnObject,

    #[error("Failed to read request body")]
    BodyRead,

    /// Detail is logged, never sent to the client
    #[error("Internal server error")]
    Internal(String),
}

/// Error body returned to the sender.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            WebhookError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidJson(_) | WebhookError::NotAnObject | WebhookError::BodyRead => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        if let WebhookError::Internal(detail) = &self {
            error!(detail = %detail, "webhook_internal_error");
        }

        let body = ErrorResponse {
            error: self.to_string(),
        };

        (self.status_code(), Json(body)).into_response()
    }
}
