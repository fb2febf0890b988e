// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TrackMe Session
//!
//! The authenticated reporting pipeline.
//!
//! - [`SessionManager`] - login, logout and submissions, with one
//!   single-flight refresh-and-retry per 401
//! - [`Reporter`] - runs a [`trackme_core::LocationFeed`] while background
//!   reporting is on and the session is live
//! - [`StatusBoard`] - the "Updating..." / "Last updated" status line
//! - [`feed`] - channel, timer and line-oriented feeds
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trackme_fetch::HttpTransport;
//! use trackme_session::SessionManager;
//! use trackme_store::FileCredentialStore;
//!
//! let manager = SessionManager::new(
//!     Arc::new(HttpTransport::new("http://127.0.0.1:5000")?),
//!     Arc::new(FileCredentialStore::at_default_path()),
//! );
//! manager.resume().await?;
//! let ack = manager.submit_location(LocationSample::now(55.6, 12.5)?).await?;
//! ```

pub mod error;
pub mod events;
pub mod feed;
pub mod manager;
pub mod reporter;
pub mod status;

pub use error::{SessionError, SessionErrorKind};
pub use events::SessionEvent;
pub use feed::{ChannelFeed, FeedHandle, IntervalFeed, LineFeed};
pub use manager::SessionManager;
pub use reporter::{ReportSummary, Reporter, gate_open};
pub use status::StatusBoard;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod manager_tests;
