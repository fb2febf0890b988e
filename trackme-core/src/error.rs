//! Core error types for `TrackMe`.

use thiserror::Error;

/// Core error type for `TrackMe` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Coordinate outside the valid range.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// A location sample could not be parsed.
    #[error("Invalid sample: {0}")]
    InvalidSample(String),
}
