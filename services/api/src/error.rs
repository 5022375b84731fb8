//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and its mapping
//! onto the JSON failure envelope. Handlers return `Result<_, ApiError>`;
//! nothing escapes to a framework error page on the API surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::error;

use crate::config::ConfigError;
use storynest_core::generation::GenerationError;
use storynest_core::ports::PortError;
use storynest_core::validate::ValidationError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials or a missing/invalid session token.
    #[error("{0}")]
    Auth(String),

    /// Authenticated but not permitted. Deliberately answered with 401
    /// rather than 403, matching the API's documented behavior.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Too many requests, please try again later")]
    RateLimited,

    /// An external dependency (asset host, generation provider) failed.
    #[error("Upstream service error: {0}")]
    Upstream(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error from the underlying database library.
    #[error("Database error: {0}")]
    Database(String),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth(_) | Self::Forbidden(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_)
            | Self::Config(_)
            | Self::Database(_)
            | Self::Io(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed into the failure envelope. Internal details are
    /// logged, never echoed to clients.
    fn client_message(&self) -> String {
        match self {
            Self::Validation(_)
            | Self::Auth(_)
            | Self::Forbidden(_)
            | Self::NotFound(_)
            | Self::RateLimited => self.to_string(),
            Self::Upstream(_) => "An upstream service failed, please try again later".to_string(),
            Self::Config(_) | Self::Database(_) | Self::Io(_) | Self::Internal(_) => {
                "Something went wrong on our end".to_string()
            }
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(msg) => Self::NotFound(msg),
            PortError::Unexpected(msg) => Self::Internal(msg),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::EmptyPrompt => Self::Validation(err.to_string()),
            GenerationError::Upstream(inner) => Self::Upstream(inner.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Serialize)]
struct FailureEnvelope {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {self}");
        }
        let body = FailureEnvelope {
            success: false,
            message: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("no token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        // Authorization failures are 401 in this API, not 403.
        assert_eq!(
            ApiError::Forbidden("not yours".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Upstream("provider".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_detail_is_not_echoed_to_clients() {
        let err = ApiError::Database("connection refused at 10.0.0.5".into());
        assert!(!err.client_message().contains("10.0.0.5"));
    }
}
