//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error types.
///
/// Every variant renders as `{"error": "<message>"}` with its status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Operator misconfiguration (e.g. no admin token). The message is safe to show.
    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Rate limited")]
    RateLimited,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Misconfigured(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::Internal(msg) => {
                // Log detailed error server-side, return generic message to client
                tracing::error!(error = %msg, "Internal server error");
                "Server error".to_string()
            }
            AppError::Misconfigured(msg) => {
                tracing::error!(error = %msg, "Service misconfigured");
                msg
            }
            AppError::Unauthorized(msg) | AppError::Forbidden(msg) => msg,
            AppError::RateLimited => "Too many attempts".to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}
