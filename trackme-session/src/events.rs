//! Events published by the session manager.

use serde::Serialize;
use trackme_core::{Acknowledgement, LocationSample, LogoutReason};

use crate::error::SessionErrorKind;

/// Something observers may want to react to.
///
/// Delivered over a broadcast channel; slow receivers may miss events.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A login succeeded or a persisted session was resumed.
    LoggedIn {
        /// Account name.
        username: String,
    },
    /// The session ended.
    LoggedOut {
        /// Why.
        reason: LogoutReason,
    },
    /// A submission is about to be sent.
    SubmissionStarted {
        /// The sample being submitted.
        sample: LocationSample,
    },
    /// The server acknowledged a sample.
    LocationSubmitted {
        /// The acknowledgement.
        ack: Acknowledgement,
    },
    /// A started submission failed.
    SubmissionFailed {
        /// Error category.
        kind: SessionErrorKind,
        /// Human-readable message.
        message: String,
    },
    /// A refresh stored a new token pair.
    CredentialsRefreshed,
}
