//! Host APIs for TrackMe.
//!
//! - [`http`] - `reqwest` transport with tracing and JSON headers

pub mod http;

pub use http::HttpTransport;
