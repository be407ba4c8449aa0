// src/error.rs

//! Unified error handling for the API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// No response was received (connect, timeout, body read).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A 401 could not be recovered because the token refresh failed.
    #[error("Token refresh failed: {0}")]
    Refresh(#[from] RefreshError),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Failure of the refresh procedure.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// The session holds no refresh token; nothing was sent.
    #[error("no refresh token stored")]
    MissingRefreshToken,

    /// The refresh call never got a response.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The refresh endpoint answered with a non-success status.
    #[error("rejected with HTTP {status}: {body}")]
    Rejected { status: StatusCode, body: String },

    /// The refresh endpoint answered 2xx but the body had no token pair.
    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl AppError {
    /// Create an error from a non-success response.
    pub fn status(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Refresh(RefreshError::Rejected { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// True for a structured 401 response. Transport failures are never 401.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// True when the session can no longer be used and the user must log in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Refresh(_)) || self.is_unauthorized()
    }
}
