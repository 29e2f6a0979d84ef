//! Application Error Types
//!
//! Centralized error handling with Axum integration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, 1000, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, 1000, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, 1000, msg.clone()),
            AppError::InvalidConversation(msg) => (StatusCode::BAD_REQUEST, 1003, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, 1004, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, 1008, msg.clone()),
            AppError::Timeout(msg) => {
                tracing::error!("Store timeout: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, 1009, "Storage unavailable".into())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 1009, "Internal server error".into())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, 1009, "Internal server error".into())
            }
        };

        (status, Json(ErrorResponse { code, message })).into_response()
    }
}
