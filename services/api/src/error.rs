//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is reported to HTTP callers.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use image_prompt_core::ports::PortError;
use serde_json::json;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error(transparent)]
    Port(#[from] PortError),

    /// The request body could not be read as the expected JSON.
    #[error("{0}")]
    BadRequest(String),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Port(PortError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Self::Port(PortError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Port(PortError::QuotaExceeded) => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image_prompt_core::ports::{QUOTA_MESSAGE, RATE_LIMIT_MESSAGE};

    #[test]
    fn port_errors_map_to_the_relay_status_taxonomy() {
        let cases = [
            (PortError::InvalidInput("Invalid action".into()), 400, "Invalid action"),
            (PortError::RateLimited, 429, RATE_LIMIT_MESSAGE),
            (PortError::QuotaExceeded, 402, QUOTA_MESSAGE),
            (PortError::Upstream { status: 503 }, 500, "AI Gateway error: 503"),
            (PortError::NoImageGenerated, 500, "No image generated"),
            (PortError::EmptyReply, 500, "No content in AI response"),
            (PortError::Remote("AI Gateway error: 503".into()), 500, "AI Gateway error: 503"),
        ];
        for (port_error, status, message) in cases {
            let err = ApiError::from(port_error);
            assert_eq!(err.status().as_u16(), status);
            assert_eq!(err.to_string(), message);
        }
    }
}
