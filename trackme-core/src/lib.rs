// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `TrackMe` Core
//!
//! Core types, models, and traits for the `TrackMe` location reporter.
//!
//! This crate provides the foundational abstractions used across all other
//! `TrackMe` crates:
//!
//! - Domain models (credentials, location samples, session state)
//! - Error types
//! - The [`LocationFeed`] trait implemented by sample sources
//!
//! ## Key Types
//!
//! ### Session
//! - [`Credentials`] - Username plus an optional [`TokenPair`]
//! - [`SessionState`] - `LoggedOut`, `LoggedIn`, `RefreshingCredentials`
//! - [`LogoutReason`] - Why a session ended
//!
//! ### Submissions
//! - [`LocationSample`] - A validated position with observation time
//! - [`SubmissionOutcome`] - Result of one submission attempt
//! - [`Acknowledgement`] - A successfully reported sample

pub mod error;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    Acknowledgement, Credentials, FailureReason, LocationSample, LogoutReason, SessionState,
    SubmissionOutcome, TokenPair,
};

// Re-export traits
pub use traits::LocationFeed;
