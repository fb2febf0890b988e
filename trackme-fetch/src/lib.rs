// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TrackMe Fetch
//!
//! HTTP transport and request codec for the TrackMe location reporter.
//!
//! ## Transport
//!
//! - [`transport::Transport`] - One POST per call, no retries
//! - [`host::http::HttpTransport`] - `reqwest` implementation
//! - [`transport::RawResponse::outcome`] - 200 / 401 / other classification
//!
//! ## Codec
//!
//! The [`codec`] module builds the JSON bodies for `/auth`,
//! `/refreshtoken` and `/coordinates`, and parses token pairs.
//!
//! ## Example
//!
//! ```ignore
//! use trackme_fetch::{codec, paths, HttpTransport, Transport};
//!
//! let transport = HttpTransport::new("http://127.0.0.1:5000")?;
//! let body = codec::encode_location_submission(&sample, &credentials)?;
//! let outcome = transport.post(paths::COORDINATES, body).await?.outcome();
//! ```

pub mod codec;
pub mod error;
pub mod host;
pub mod transport;

// Errors
pub use error::{CodecError, TransportError};

// Transport
pub use host::http::HttpTransport;
pub use transport::{paths, HttpOutcome, RawResponse, Transport};

// Codec
pub use codec::LocationSubmission;
