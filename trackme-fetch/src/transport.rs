//! Transport abstraction and response classification.
//!
//! A [`Transport`] issues exactly one POST per call and hands back the raw
//! status and body. [`RawResponse::outcome`] applies the status rules:
//!
//! | Status | Outcome |
//! |---|---|
//! | 200 | [`HttpOutcome::Success`] |
//! | 401 | [`HttpOutcome::Unauthorized`] |
//! | anything else | [`HttpOutcome::Rejected`] |

use async_trait::async_trait;

use crate::error::TransportError;

// ============================================================================
// Endpoints
// ============================================================================

/// Server endpoints, relative to the configured base URL.
pub mod paths {
    /// Exchanges username and password for a token pair.
    pub const AUTH: &str = "/auth";
    /// Exchanges a refresh token for a new token pair.
    pub const REFRESH_TOKEN: &str = "/refreshtoken";
    /// Accepts an authenticated location submission.
    pub const COORDINATES: &str = "/coordinates";
}

// ============================================================================
// Responses
// ============================================================================

/// Status code and body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Classifies the response by status.
    pub fn outcome(self) -> HttpOutcome {
        match self.status {
            200 => HttpOutcome::Success(self.body),
            401 => HttpOutcome::Unauthorized,
            status => HttpOutcome::Rejected(status),
        }
    }
}

/// Classified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpOutcome {
    /// 200 with body.
    Success(Vec<u8>),
    /// 401. Not an error: callers route this to refresh logic.
    Unauthorized,
    /// Any other status.
    Rejected(u16),
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Issues JSON POST requests against the reporting server.
///
/// Implementations must send `Content-Type: application/json` and
/// `Accept: application/json`, must not retry, and must report a missing
/// response (connection failure, timeout) as [`TransportError`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// POSTs `body` to `path` and returns whatever the server answered.
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<RawResponse, TransportError>;
}
