//! User preferences store.
//!
//! Manages user settings with persistence and change notification.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, watch};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{default_settings_path, load_json, save_json};

/// Environment variable that overrides the configured server URL.
pub const SERVER_URL_ENV: &str = "TRACKME_SERVER_URL";

/// Server used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

// ============================================================================
// Settings Types
// ============================================================================

/// User preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the tracking server.
    pub server_url: String,

    /// Whether samples are reported while logged in.
    pub background_enabled: bool,

    /// Where credentials are persisted.
    pub credential_backend: CredentialBackendKind,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Cadence for periodic reporting.
    pub report_interval: ReportInterval,

    /// How long a status message stays visible, in seconds.
    pub status_fade_secs: u64,

    /// Log level.
    pub log_level: LogLevel,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            background_enabled: false,
            credential_backend: CredentialBackendKind::default(),
            request_timeout_secs: 30,
            report_interval: ReportInterval::default(),
            status_fade_secs: 4,
            log_level: LogLevel::default(),
        }
    }
}

impl Settings {
    /// Returns the server URL, honoring `TRACKME_SERVER_URL`.
    pub fn effective_server_url(&self) -> String {
        resolve_server_url(std::env::var(SERVER_URL_ENV).ok(), &self.server_url)
    }

    /// Returns the request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Returns how long status messages stay visible.
    pub fn status_fade(&self) -> Duration {
        Duration::from_secs(self.status_fade_secs)
    }
}

fn resolve_server_url(env_value: Option<String>, configured: &str) -> String {
    match env_value {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => configured.to_string(),
    }
}

/// Credential persistence backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackendKind {
    /// JSON file in the config directory.
    #[default]
    File,
    /// System keychain.
    Keychain,
}

impl std::fmt::Display for CredentialBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialBackendKind::File => write!(f, "file"),
            CredentialBackendKind::Keychain => write!(f, "keychain"),
        }
    }
}

impl std::str::FromStr for CredentialBackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keychain" => Ok(Self::Keychain),
            other => Err(StoreError::InvalidSetting(format!(
                "unknown credential backend '{other}' (expected 'file' or 'keychain')"
            ))),
        }
    }
}

/// Periodic reporting cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportInterval {
    /// Report only when asked.
    Manual,
    /// Every thirty seconds.
    ThirtySeconds,
    /// Every minute.
    #[default]
    OneMinute,
    /// Every five minutes.
    FiveMinutes,
    /// Every fifteen minutes.
    FifteenMinutes,
}

impl ReportInterval {
    /// Returns the duration, or None for manual.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ReportInterval::Manual => None,
            ReportInterval::ThirtySeconds => Some(Duration::from_secs(30)),
            ReportInterval::OneMinute => Some(Duration::from_secs(60)),
            ReportInterval::FiveMinutes => Some(Duration::from_secs(300)),
            ReportInterval::FifteenMinutes => Some(Duration::from_secs(900)),
        }
    }

    /// All available cadences.
    pub fn all() -> &'static [ReportInterval] {
        &[
            ReportInterval::Manual,
            ReportInterval::ThirtySeconds,
            ReportInterval::OneMinute,
            ReportInterval::FiveMinutes,
            ReportInterval::FifteenMinutes,
        ]
    }
}

impl std::fmt::Display for ReportInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportInterval::Manual => write!(f, "Manual"),
            ReportInterval::ThirtySeconds => write!(f, "30 seconds"),
            ReportInterval::OneMinute => write!(f, "1 minute"),
            ReportInterval::FiveMinutes => write!(f, "5 minutes"),
            ReportInterval::FifteenMinutes => write!(f, "15 minutes"),
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error level logging.
    Error,
    /// Warning level logging.
    #[default]
    Warn,
    /// Info level logging.
    Info,
    /// Debug level logging.
    Debug,
    /// Trace level logging.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Persistent settings store with change notifications.
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
    notify: watch::Sender<u64>,
    version: Arc<RwLock<u64>>,
}

impl SettingsStore {
    /// Creates a store with default settings, persisted at `path`.
    pub fn new(path: PathBuf) -> Self {
        Self::with_settings(path, Settings::default())
    }

    fn with_settings(path: PathBuf, settings: Settings) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
            notify,
            version: Arc::new(RwLock::new(0)),
        }
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load_default() -> Result<Self, StoreError> {
        Self::load(default_settings_path()).await
    }

    /// Loads settings from a path. A missing or unreadable file yields
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be loaded from disk.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self::with_settings(path, settings))
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings and notifies subscribers.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        {
            let mut settings = self.settings.write().await;
            f(&mut settings);
        }
        self.notify_change().await;
    }

    /// Restores defaults and notifies subscribers.
    pub async fn reset(&self) {
        self.update(|s| *s = Settings::default()).await;
    }

    /// Saves settings to disk.
    ///
    /// # Errors
    ///
    /// Returns error if settings cannot be written to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    /// Subscribes to settings changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Notifies subscribers of a change.
    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Returns the effective server URL.
    pub async fn server_url(&self) -> String {
        self.settings.read().await.effective_server_url()
    }

    /// Sets the configured server URL.
    ///
    /// # Errors
    ///
    /// Returns error if the URL is not absolute http(s).
    pub async fn set_server_url(&self, url: &str) -> Result<(), StoreError> {
        let url = url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(StoreError::InvalidSetting(format!(
                "server URL must start with http:// or https://, got '{url}'"
            )));
        }
        let url = url.to_string();
        self.update(move |s| s.server_url = url).await;
        Ok(())
    }

    /// Gets the background reporting flag.
    pub async fn background_enabled(&self) -> bool {
        self.settings.read().await.background_enabled
    }

    /// Sets the background reporting flag.
    pub async fn set_background_enabled(&self, enabled: bool) {
        self.update(|s| s.background_enabled = enabled).await;
    }

    /// Gets the credential backend.
    pub async fn credential_backend(&self) -> CredentialBackendKind {
        self.settings.read().await.credential_backend
    }

    /// Sets the credential backend.
    pub async fn set_credential_backend(&self, backend: CredentialBackendKind) {
        self.update(|s| s.credential_backend = backend).await;
    }

    /// Gets the report interval.
    pub async fn report_interval(&self) -> ReportInterval {
        self.settings.read().await.report_interval
    }

    /// Sets the report interval.
    pub async fn set_report_interval(&self, interval: ReportInterval) {
        self.update(|s| s.report_interval = interval).await;
    }
}
