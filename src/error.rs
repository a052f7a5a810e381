/// Unified error types for the Makers Community backend
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Main error type for API operations
#[derive(Error, Debug)]
pub enum ApiError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (unverified email, deactivated
    /// account, non-owner/non-admin action)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed or out-of-range input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate report, already-verified email, duplicate account
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Expired or unknown single-use token. Callers never learn which.
    #[error("Invalid or expired link")]
    InvalidToken,

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Uniform response envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope<T> {
    pub status: &'static str,
    pub error: Option<String>,
    pub data: Option<T>,
    pub message: String,
}

impl<T: Serialize> ResponseEnvelope<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            error: None,
            data: Some(data),
            message: message.into(),
        }
    }
}

impl ResponseEnvelope<serde_json::Value> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            status: "success",
            error: None,
            data: None,
            message: message.into(),
        }
    }

    fn failure(error: String, message: String) -> Self {
        Self {
            status: "error",
            error: Some(error),
            data: None,
            message,
        }
    }
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, msg.clone(), self.to_string())
            }
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone(), self.to_string()),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg.clone(),
                self.to_string(),
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone(), self.to_string()),
            ApiError::Conflict(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg.clone(),
                self.to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::BAD_REQUEST,
                "Invalid token".to_string(),
                self.to_string(),
            ),
            ApiError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
                "Rate limit exceeded".to_string(),
            ),
            ApiError::Database(_) | ApiError::Internal(_) | ApiError::Io(_) => {
                tracing::error!(error = %self, "internal error surfaced at operation boundary");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ResponseEnvelope::failure(error, message));
        (status, body).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
