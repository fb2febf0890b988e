//! Trait definitions for TrackMe.
//!
//! The location source is an external capability; this module only fixes
//! the contract the reporting pipeline relies on.

use crate::models::LocationSample;

/// A lazy source of location samples.
///
/// Implementors wrap whatever produces positions: an OS significant-change
/// monitor, a periodic timer, a test channel. Samples may arrive in any
/// order relative to their `observed_at` time.
///
/// A stopped feed must not yield samples. Callers drive `start`/`stop` from
/// the background preference and the session state.
pub trait LocationFeed: Send {
    /// Begins producing samples. Idempotent.
    fn start(&mut self);

    /// Stops producing samples. Idempotent. Samples produced while stopped
    /// are discarded.
    fn stop(&mut self);

    /// Returns true between `start` and `stop`.
    fn is_running(&self) -> bool;

    /// Waits for the next sample.
    ///
    /// Returns `None` once the feed is exhausted and will never yield again.
    fn next_sample(&mut self) -> impl std::future::Future<Output = Option<LocationSample>> + Send;
}
