//! Error types for sdp-core.

use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias using sdp-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for SDP operations
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // HTTP status errors
    #[error("Authentication failed (401) for {path}: {body}")]
    Auth { path: String, body: String },

    #[error("Permission denied (403) for {path}: {body}")]
    Permission { path: String, body: String },

    #[error("Not found (404): {0}")]
    NotFound(String),

    #[error("API error {status} for {path}: {body}")]
    Api {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },

    // Input errors
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Batch outcomes
    #[error(
        "user {user_id} was converted to technician {technician_id} but assignments failed (conversion not rolled back): {}",
        .failures.join("; ")
    )]
    PartialConversion {
        user_id: String,
        technician_id: String,
        failures: Vec<String>,
    },

    #[error("{failed} of {total} operations failed")]
    PartialBatchFailure { failed: usize, total: usize },
}

impl Error {
    /// Map a non-success HTTP status to the matching error variant
    pub fn from_status(status: reqwest::StatusCode, path: impl Into<String>, body: String) -> Self {
        let path = path.into();
        match status {
            reqwest::StatusCode::UNAUTHORIZED => Self::Auth { path, body },
            reqwest::StatusCode::FORBIDDEN => Self::Permission { path, body },
            reqwest::StatusCode::NOT_FOUND => Self::NotFound(path),
            _ => Self::Api {
                status: status.as_u16(),
                path,
                body,
            },
        }
    }

    /// Create a decode error for a response body
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status carried by this error, if it came from a response
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { .. } => Some(401),
            Self::Permission { .. } => Some(403),
            Self::NotFound(_) => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
