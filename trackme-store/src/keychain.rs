//! Secure secret storage using the system keychain.
//!
//! This module provides access to the system's secure credential storage:
//! - macOS: Keychain Services
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KDE Wallet)

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::error::KeychainError;

/// Service name prefix for `TrackMe` secrets.
const SERVICE_PREFIX: &str = "trackme";

/// Service name under which the session is stored.
pub const SESSION_SERVICE: &str = "session";

/// Account name under which the session is stored.
pub const SESSION_ACCOUNT: &str = "credentials";

// ============================================================================
// Keychain API Trait
// ============================================================================

/// API for secure secret storage.
#[async_trait]
pub trait KeychainApi: Send + Sync {
    /// Get a secret from the keychain.
    ///
    /// # Returns
    /// * `Ok(Some(secret))` - Secret found
    /// * `Ok(None)` - Secret not found
    /// * `Err(e)` - Error accessing keychain
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError>;

    /// Set a secret in the keychain, replacing any existing value.
    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), KeychainError>;

    /// Delete a secret. Deleting a missing secret succeeds.
    async fn delete(&self, service: &str, account: &str) -> Result<(), KeychainError>;
}

// ============================================================================
// System Keychain Implementation
// ============================================================================

/// Default implementation using the `keyring` crate.
#[derive(Debug, Clone, Default)]
pub struct SystemKeychain;

impl SystemKeychain {
    /// Creates a new system keychain instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds the full service name with prefix.
    fn full_service(service: &str) -> String {
        format!("{SERVICE_PREFIX}:{service}")
    }

    /// Creates a keyring entry.
    fn entry(service: &str, account: &str) -> Result<Entry, KeychainError> {
        let full_service = Self::full_service(service);
        Entry::new(&full_service, account).map_err(|e| KeychainError::Platform(e.to_string()))
    }
}

#[async_trait]
impl KeychainApi for SystemKeychain {
    async fn get(&self, service: &str, account: &str) -> Result<Option<String>, KeychainError> {
        debug!(service = %service, account = %account, "Getting secret from keychain");

        let entry = Self::entry(service, account)?;

        match entry.get_password() {
            Ok(secret) if secret.is_empty() => Ok(None),
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %service, account = %account, "Secret not found");
                Ok(None)
            }
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to get secret");
                Err(e.into())
            }
        }
    }

    async fn set(&self, service: &str, account: &str, secret: &str) -> Result<(), KeychainError> {
        debug!(service = %service, account = %account, "Setting secret in keychain");

        let entry = Self::entry(service, account)?;

        entry.set_password(secret).map_err(|e| {
            warn!(service = %service, account = %account, error = %e, "Failed to set secret");
            KeychainError::from(e)
        })
    }

    async fn delete(&self, service: &str, account: &str) -> Result<(), KeychainError> {
        debug!(service = %service, account = %account, "Deleting secret from keychain");

        let entry = Self::entry(service, account)?;

        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!(service = %service, account = %account, error = %e, "Failed to delete secret");
                Err(e.into())
            }
        }
    }
}
