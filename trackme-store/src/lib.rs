// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # TrackMe Store
//!
//! Persistence for the TrackMe client.
//!
//! This crate provides:
//!
//! - **CredentialStore**: the session credentials, with serialized access
//!   and compare-and-swap token rotation
//! - **SettingsStore**: user preferences with persistence
//! - **Persistence**: file I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use trackme_store::{CredentialStore, FileCredentialStore, SettingsStore};
//!
//! let settings = SettingsStore::load_default().await?;
//! let store = FileCredentialStore::at_default_path();
//!
//! let creds = store.get().await?;
//! if creds.has_session() {
//!     println!("Logged in as {}", creds.username());
//! }
//! ```

pub mod credential_store;
pub mod error;
pub mod keychain;
pub mod persistence;
pub mod settings_store;

pub use credential_store::{
    CredentialBackend, CredentialStore, FileBackend, FileCredentialStore, KeychainBackend,
    KeychainCredentialStore, MemoryBackend, MemoryCredentialStore, SerializedCredentialStore,
};
pub use error::{KeychainError, StoreError};
pub use keychain::{KeychainApi, SystemKeychain};
pub use persistence::{
    default_config_dir, default_credentials_path, default_settings_path, load_json, remove_file,
    save_json,
};
pub use settings_store::{
    CredentialBackendKind, DEFAULT_SERVER_URL, LogLevel, ReportInterval, SERVER_URL_ENV, Settings,
    SettingsStore,
};
