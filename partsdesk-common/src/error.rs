//! Common error types for partsdesk

use thiserror::Error;

/// Common result type for partsdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across partsdesk services
#[derive(Error, Debug)]
pub enum Error {
    /// Terminal non-2xx response from the remote API (retries exhausted
    /// or not retryable); carries status and the response body
    #[error("Remote API error {status}: {message}")]
    Transport { status: u16, message: String },

    /// Network-level failure before a response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error is a terminal remote-API response with the
    /// given status code.
    pub fn is_status(&self, status: u16) -> bool {
        matches!(self, Error::Transport { status: s, .. } if *s == status)
    }
}
