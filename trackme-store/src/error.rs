//! Store error types.

use thiserror::Error;

/// Errors from the credential and settings stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a store file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The system keychain refused or failed.
    #[error("Keychain error: {0}")]
    Keychain(#[from] KeychainError),

    /// A setting value was rejected.
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}

// ============================================================================
// Keychain Error
// ============================================================================

/// Keychain failures, flattened from `keyring`.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// No secret service is reachable (locked or missing).
    #[error("Keychain unavailable: {0}")]
    Unavailable(String),

    /// The platform store reported a failure.
    #[error("Platform error: {0}")]
    Platform(String),

    /// More than one entry matched the session.
    #[error("Several keychain entries match the session")]
    Ambiguous,

    /// Anything else.
    #[error("Keychain error: {0}")]
    Other(String),
}

impl From<keyring::Error> for KeychainError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(e) => KeychainError::Unavailable(e.to_string()),
            keyring::Error::PlatformFailure(e) => KeychainError::Platform(e.to_string()),
            keyring::Error::Ambiguous(_) => KeychainError::Ambiguous,
            other => KeychainError::Other(other.to_string()),
        }
    }
}
