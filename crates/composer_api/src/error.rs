//! Error types for backend requests.

use thiserror::Error;

/// Errors that can occur while talking to the composer backend.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure: connection refused, timeout, TLS
    #[error("Request to {url} failed: {source}")]
    Transport {
        /// The URL that was requested
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-success status code
    #[error("Backend returned HTTP {status} for {url}")]
    Status {
        /// The URL that was requested
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body did not match the documented shape
    #[error("Malformed response from {url}: {source}")]
    Decode {
        /// The URL that was requested
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Base URL or path could not be assembled
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
