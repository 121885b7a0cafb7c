//! Error types for the gateway.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tollgate_oauth::OAuthError;

/// Gateway error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Malformed inbound request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No usable credentials in the session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The session lacks fields the operation requires (lost cookie or forged callback).
    #[error("Session integrity error: {0}")]
    SessionIntegrity(String),

    /// The identity provider refused or garbled an exchange.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The backend or provider could not be reached.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<OAuthError> for ServerError {
    fn from(e: OAuthError) -> Self {
        match e {
            OAuthError::Network(msg) => ServerError::UpstreamUnavailable(msg),
            OAuthError::Rejected { .. } | OAuthError::InvalidResponse(_) => {
                ServerError::Provider(e.to_string())
            }
            OAuthError::Config(msg) => ServerError::Config(msg),
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ServerError {
    /// Status code and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ServerError::SessionIntegrity(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "session_integrity")
            }
            ServerError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            ServerError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "upstream_unavailable"),
            ServerError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
