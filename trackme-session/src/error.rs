//! Session error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trackme_core::CoreError;
use trackme_fetch::{CodecError, TransportError};
use trackme_store::StoreError;

/// Errors surfaced by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A submission was attempted while logged out. No request was sent.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The session was rejected even after a refresh and has been logged out.
    #[error("Session expired, log in again")]
    SessionExpired,

    /// No response from the server.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered 200 with a body that could not be used.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The server answered with a status other than 200 or 401.
    #[error("Server rejected the request with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// `/auth` did not answer 200.
    #[error("Login rejected with status {status}")]
    LoginRejected {
        /// HTTP status code.
        status: u16,
    },

    /// Credential persistence failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A request body could not be built.
    #[error("Codec error: {0}")]
    Codec(CodecError),

    /// The manager was shut down.
    #[error("Session manager shut down")]
    Cancelled,

    /// The sample failed validation.
    #[error("Invalid sample: {0}")]
    InvalidSample(#[from] CoreError),
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::MalformedResponse(msg) => SessionError::MalformedResponse(msg),
            CodecError::MissingAccessToken { .. } => SessionError::NotAuthenticated,
            other @ CodecError::Encode(_) => SessionError::Codec(other),
        }
    }
}

impl SessionError {
    /// Returns true if trying the same operation again later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::Transport(_) => true,
            SessionError::Rejected { status } => (500..600).contains(status),
            _ => false,
        }
    }

    /// Returns true if this error means the user has to log in.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            SessionError::NotAuthenticated | SessionError::SessionExpired
        )
    }

    /// Returns the variant without its payload.
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::NotAuthenticated => SessionErrorKind::NotAuthenticated,
            SessionError::SessionExpired => SessionErrorKind::SessionExpired,
            SessionError::Transport(_) => SessionErrorKind::Transport,
            SessionError::MalformedResponse(_) => SessionErrorKind::MalformedResponse,
            SessionError::Rejected { .. } => SessionErrorKind::Rejected,
            SessionError::LoginRejected { .. } => SessionErrorKind::LoginRejected,
            SessionError::Store(_) => SessionErrorKind::Store,
            SessionError::Codec(_) => SessionErrorKind::Codec,
            SessionError::Cancelled => SessionErrorKind::Cancelled,
            SessionError::InvalidSample(_) => SessionErrorKind::InvalidSample,
        }
    }
}

/// Payload-free mirror of [`SessionError`], for events and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum SessionErrorKind {
    NotAuthenticated,
    SessionExpired,
    Transport,
    MalformedResponse,
    Rejected,
    LoginRejected,
    Store,
    Codec,
    Cancelled,
    InvalidSample,
}

impl SessionErrorKind {
    /// Returns true for failures that end or require a session.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::SessionExpired)
    }
}
