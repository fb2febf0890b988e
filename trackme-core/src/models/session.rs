//! Session state and submission outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::location::LocationSample;

// ============================================================================
// Session State
// ============================================================================

/// Authentication state owned by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session; submissions are rejected without a network call.
    #[default]
    LoggedOut,
    /// A token pair is available.
    LoggedIn,
    /// A token refresh is in flight.
    RefreshingCredentials,
}

impl SessionState {
    /// Returns true unless the state is [`SessionState::LoggedOut`].
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoggedOut => write!(f, "logged out"),
            Self::LoggedIn => write!(f, "logged in"),
            Self::RefreshingCredentials => write!(f, "refreshing credentials"),
        }
    }
}

// ============================================================================
// Submission Outcome
// ============================================================================

/// Why a submission attempt failed without being an auth failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FailureReason {
    /// The server answered with a status other than 200 or 401.
    Status {
        /// HTTP status code.
        code: u16,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { code } => write!(f, "server responded with status {code}"),
        }
    }
}

/// Result of a single submission attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// HTTP 200. `server_time` is when the acknowledgement was received.
    Success {
        /// Acknowledgement time.
        server_time: DateTime<Utc>,
    },
    /// HTTP 401.
    Unauthorized,
    /// Any other response.
    Failed(FailureReason),
}

/// A successfully reported sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// The sample that was reported.
    pub sample: LocationSample,
    /// When the server acknowledged it.
    pub acknowledged_at: DateTime<Utc>,
}

// ============================================================================
// Logout Reason
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// `/refreshtoken` answered 401.
    RefreshRejected,
    /// `/refreshtoken` answered 200 with an unusable body.
    MalformedRefresh,
    /// The retried submission was rejected again after a refresh.
    RetryRejected,
    /// The stored session was removed by another process.
    EndedElsewhere,
}

impl LogoutReason {
    /// Returns true if the session ended without the user asking for it.
    pub fn is_forced(&self) -> bool {
        !matches!(self, Self::UserRequested | Self::EndedElsewhere)
    }
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRequested => write!(f, "user requested logout"),
            Self::RefreshRejected => write!(f, "refresh token rejected"),
            Self::MalformedRefresh => write!(f, "malformed refresh response"),
            Self::RetryRejected => write!(f, "refreshed token rejected"),
            Self::EndedElsewhere => write!(f, "session ended in another process"),
        }
    }
}
