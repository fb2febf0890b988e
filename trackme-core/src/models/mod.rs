//! Domain models for TrackMe.
//!
//! ## Submodules
//!
//! - [`credentials`] - Session credentials (Credentials, TokenPair)
//! - [`location`] - Location samples
//! - [`session`] - Session state, submission outcomes, logout reasons

mod credentials;
mod location;
mod session;

pub use credentials::{Credentials, TokenPair};
pub use location::LocationSample;
pub use session::{Acknowledgement, FailureReason, LogoutReason, SessionState, SubmissionOutcome};
