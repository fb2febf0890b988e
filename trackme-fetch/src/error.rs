//! Transport and codec error types.

use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Transport Error
// ============================================================================

/// No usable HTTP response was received.
///
/// Never retried by the transport itself; retry policy belongs to the
/// session manager.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection or protocol failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Request timed out.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built.
    #[error("HTTP client unavailable: {0}")]
    Client(String),
}

// ============================================================================
// Codec Error
// ============================================================================

/// Error building a request body or parsing a response body.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Response body is not JSON or lacks a required key.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A submission was encoded for credentials with no session.
    #[error("No access token available for {username:?}")]
    MissingAccessToken {
        /// Username the submission was built for.
        username: String,
    },

    /// Request body could not be serialized.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}
