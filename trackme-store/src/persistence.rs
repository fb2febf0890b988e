//! On-disk JSON files under the TrackMe config directory.
//!
//! Everything written here may hold a refresh token, so files are created
//! owner-only and replaced atomically.

use serde::{Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StoreError;

const FILE_MODE: u32 = 0o600;
const DIR_MODE: u32 = 0o700;

/// Returns the TrackMe configuration directory.
///
/// - macOS: `~/Library/Application Support/TrackMe`
/// - Linux: `~/.config/trackme`
/// - Windows: `%APPDATA%\trackme`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    let dir = dirs::home_dir().map(|home| home.join("Library/Application Support/TrackMe"));

    #[cfg(not(target_os = "macos"))]
    let dir = dirs::config_dir().map(|config| config.join("trackme"));

    dir.unwrap_or_else(|| PathBuf::from("."))
}

pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

pub fn default_credentials_path() -> PathBuf {
    default_config_dir().join("credentials.json")
}

/// Restricts `path` to its owner. No-op off Unix.
#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

/// Writes `data` as pretty JSON.
///
/// A missing parent directory is created owner-only. The content goes to a
/// sibling temp file that is restricted before being renamed over `path`,
/// so readers never see a partial or world-readable file.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent.filter(|p| !p.exists()) {
        tokio::fs::create_dir_all(dir).await?;
        restrict(dir, DIR_MODE).await?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let staging = path.with_extension("json.tmp");
    tokio::fs::write(&staging, json).await?;
    restrict(&staging, FILE_MODE).await?;
    tokio::fs::rename(&staging, path).await?;

    debug!(path = %path.display(), "Saved");
    Ok(())
}

pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    debug!(path = %path.display(), "Loaded");
    Ok(data)
}

/// Deletes `path`. A file that is already gone counts as deleted.
pub async fn remove_file(path: &Path) -> Result<bool, StoreError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "Removed");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
