//! CLI command implementations.

pub mod config;
pub mod login;
pub mod report;
pub mod status;
pub mod watch;
