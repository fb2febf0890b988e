//! Credential store.
//!
//! The store is the single owner of the session credentials. Every
//! operation runs under one async mutex, so writes are serialized and a
//! read always sees the last completed write. Writes go to the backend
//! first and only then to the in-memory copy, so a failed write leaves the
//! previous value visible.
//!
//! File and keychain data can be changed by another `trackme` process, so
//! those backends are re-read on every `get` and inside every
//! `swap_tokens`. Only the memory backend is served from the copy.
//!
//! Backends:
//!
//! - [`FileCredentialStore`] - JSON file with owner-only permissions
//! - [`KeychainCredentialStore`] - one system keychain entry
//! - [`MemoryCredentialStore`] - process-local

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use trackme_core::{Credentials, TokenPair};

use crate::error::StoreError;
use crate::keychain::{KeychainApi, SESSION_ACCOUNT, SESSION_SERVICE, SystemKeychain};
use crate::persistence::{default_credentials_path, load_json, remove_file, save_json};

// ============================================================================
// Store Trait
// ============================================================================

/// Durable, serialized access to the session credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the current credentials.
    async fn get(&self) -> Result<Credentials, StoreError>;

    /// Replaces the credentials.
    async fn set(&self, credentials: Credentials) -> Result<(), StoreError>;

    /// Removes the credentials.
    async fn clear(&self) -> Result<(), StoreError>;

    /// Replaces the credentials only if the stored token pair equals
    /// `expected`. Returns whether the write happened.
    ///
    /// The read and the write happen in one critical section.
    async fn swap_tokens(&self, expected: &TokenPair, next: Credentials) -> Result<bool, StoreError>;
}

// ============================================================================
// Backends
// ============================================================================

/// Where a [`SerializedCredentialStore`] keeps its data.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// True if other processes may write the same data.
    fn shared(&self) -> bool {
        true
    }

    /// Loads the persisted credentials, or empty credentials if none exist.
    async fn load(&self) -> Result<Credentials, StoreError>;

    /// Persists `credentials`.
    async fn save(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Removes the persisted credentials.
    async fn erase(&self) -> Result<(), StoreError>;
}

/// JSON file backend.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

#[async_trait]
impl CredentialBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Credentials, StoreError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No credentials file");
            return Ok(Credentials::empty());
        }
        match load_json(&self.path).await {
            Ok(credentials) => Ok(credentials),
            Err(StoreError::Serialization(e)) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable credentials file, treating as logged out");
                Ok(Credentials::empty())
            }
            Err(e) => Err(e),
        }
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        save_json(&self.path, credentials).await
    }

    async fn erase(&self) -> Result<(), StoreError> {
        remove_file(&self.path).await?;
        Ok(())
    }
}

/// System keychain backend. The whole record is one secret.
#[derive(Debug, Clone, Default)]
pub struct KeychainBackend<K = SystemKeychain> {
    keychain: K,
}

#[async_trait]
impl<K: KeychainApi> CredentialBackend for KeychainBackend<K> {
    fn name(&self) -> &'static str {
        "keychain"
    }

    async fn load(&self) -> Result<Credentials, StoreError> {
        match self.keychain.get(SESSION_SERVICE, SESSION_ACCOUNT).await? {
            Some(secret) => Ok(serde_json::from_str(&secret).unwrap_or_else(|e| {
                warn!(error = %e, "Unreadable keychain credentials, treating as logged out");
                Credentials::empty()
            })),
            None => Ok(Credentials::empty()),
        }
    }

    async fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let secret = serde_json::to_string(credentials)?;
        self.keychain
            .set(SESSION_SERVICE, SESSION_ACCOUNT, &secret)
            .await?;
        Ok(())
    }

    async fn erase(&self) -> Result<(), StoreError> {
        self.keychain.delete(SESSION_SERVICE, SESSION_ACCOUNT).await?;
        Ok(())
    }
}

/// Process-local backend; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    initial: Credentials,
}

#[async_trait]
impl CredentialBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn shared(&self) -> bool {
        false
    }

    async fn load(&self) -> Result<Credentials, StoreError> {
        Ok(self.initial.clone())
    }

    async fn save(&self, _credentials: &Credentials) -> Result<(), StoreError> {
        Ok(())
    }

    async fn erase(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// Serialized Store
// ============================================================================

/// [`CredentialStore`] over any backend, with a write-through copy for
/// backends no one else writes.
pub struct SerializedCredentialStore<B> {
    backend: B,
    cache: Mutex<Option<Credentials>>,
}

/// Credentials in a JSON file.
pub type FileCredentialStore = SerializedCredentialStore<FileBackend>;

/// Credentials in the system keychain.
pub type KeychainCredentialStore<K = SystemKeychain> = SerializedCredentialStore<KeychainBackend<K>>;

/// Credentials in memory.
pub type MemoryCredentialStore = SerializedCredentialStore<MemoryBackend>;

impl<B: CredentialBackend> SerializedCredentialStore<B> {
    /// Wraps a backend. Nothing is read until first use.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            cache: Mutex::new(None),
        }
    }
}

impl FileCredentialStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(FileBackend { path: path.into() })
    }

    /// Creates a store at the default credentials path.
    pub fn at_default_path() -> Self {
        Self::new(default_credentials_path())
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.backend.path
    }
}

impl<K: KeychainApi> KeychainCredentialStore<K> {
    /// Creates a store backed by `keychain`.
    pub fn with_keychain(keychain: K) -> Self {
        Self::with_backend(KeychainBackend { keychain })
    }
}

impl MemoryCredentialStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self::with_backend(MemoryBackend::default())
    }

    /// Creates an in-memory store pre-populated with `credentials`.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self::with_backend(MemoryBackend {
            initial: credentials,
        })
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the current value, loading it from the backend when the copy is
/// missing or the backend is shared.
async fn current<'a, B: CredentialBackend>(
    backend: &B,
    slot: &'a mut Option<Credentials>,
) -> Result<&'a Credentials, StoreError> {
    if slot.is_none() || backend.shared() {
        let loaded = backend.load().await?;
        debug!(backend = backend.name(), has_session = loaded.has_session(), "Credentials loaded");
        *slot = Some(loaded);
    }
    Ok(slot.get_or_insert_with(Credentials::empty))
}

#[async_trait]
impl<B: CredentialBackend> CredentialStore for SerializedCredentialStore<B> {
    async fn get(&self) -> Result<Credentials, StoreError> {
        let mut slot = self.cache.lock().await;
        Ok(current(&self.backend, &mut slot).await?.clone())
    }

    #[instrument(skip_all)]
    async fn set(&self, credentials: Credentials) -> Result<(), StoreError> {
        let mut slot = self.cache.lock().await;
        self.backend.save(&credentials).await?;
        info!(backend = self.backend.name(), username = %credentials.username(), "Credentials stored");
        *slot = Some(credentials);
        Ok(())
    }

    #[instrument(skip_all)]
    async fn clear(&self) -> Result<(), StoreError> {
        let mut slot = self.cache.lock().await;
        self.backend.erase().await?;
        *slot = Some(Credentials::empty());
        info!(backend = self.backend.name(), "Credentials cleared");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn swap_tokens(&self, expected: &TokenPair, next: Credentials) -> Result<bool, StoreError> {
        let mut slot = self.cache.lock().await;
        let current = current(&self.backend, &mut slot).await?;
        if current.tokens() != Some(expected) {
            debug!("Stored tokens changed underneath, not swapping");
            return Ok(false);
        }
        self.backend.save(&next).await?;
        *slot = Some(next);
        info!(backend = self.backend.name(), "Credentials rotated");
        Ok(true)
    }
}
