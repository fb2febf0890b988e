//! Wiring shared by the session commands.

use anyhow::{Context as _, Result};
use std::sync::Arc;
use tracing::debug;
use trackme_fetch::HttpTransport;
use trackme_session::SessionManager;
use trackme_store::{
    CredentialBackendKind, CredentialStore, FileCredentialStore, KeychainCredentialStore,
    MemoryCredentialStore, Settings, SettingsStore, SystemKeychain,
};

use crate::Cli;

/// Settings plus a session manager built from them.
pub struct AppContext {
    /// Settings in effect for this run.
    pub settings: Settings,
    /// Server the manager talks to.
    pub server_url: String,
    /// The session manager, resumed from the credential store.
    pub manager: Arc<SessionManager>,
    /// Credentials live in memory only.
    pub ephemeral: bool,
}

impl AppContext {
    /// Loads settings, opens the configured credential store and resumes
    /// any persisted session.
    pub async fn open(cli: &Cli) -> Result<Self> {
        let settings = SettingsStore::load_default().await?.get().await;
        let server_url = cli
            .server
            .clone()
            .unwrap_or_else(|| settings.effective_server_url());

        let transport = HttpTransport::with_timeout(&server_url, settings.request_timeout())
            .with_context(|| format!("Invalid server URL '{server_url}'"))?;
        let store = credential_store(cli, settings.credential_backend);
        debug!(server = %server_url, backend = %settings.credential_backend, "Opening session");

        let manager = Arc::new(SessionManager::new(Arc::new(transport), store));
        manager.resume().await?;

        Ok(Self {
            settings,
            server_url,
            manager,
            ephemeral: cli.ephemeral,
        })
    }

    /// Names the credential store in use.
    pub fn backend_label(&self) -> String {
        if self.ephemeral {
            "memory".to_string()
        } else {
            self.settings.credential_backend.to_string()
        }
    }
}

/// Builds the credential store selected by the settings.
pub fn credential_store(cli: &Cli, backend: CredentialBackendKind) -> Arc<dyn CredentialStore> {
    if cli.ephemeral {
        return Arc::new(MemoryCredentialStore::new());
    }
    match backend {
        CredentialBackendKind::File => Arc::new(FileCredentialStore::at_default_path()),
        CredentialBackendKind::Keychain => {
            Arc::new(KeychainCredentialStore::with_keychain(SystemKeychain::new()))
        }
    }
}
