//! Config command - manage configuration.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use tracing::info;
use trackme_store::{
    CredentialBackendKind, ReportInterval, SettingsStore, default_config_dir,
    default_credentials_path, default_settings_path, remove_file,
};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set the server base URL.
    Server {
        /// URL, e.g. http://127.0.0.1:5000
        url: String,
    },

    /// Turn background reporting on or off.
    Background {
        /// on or off.
        state: String,
    },

    /// Choose where credentials are kept.
    Backend {
        /// file or keychain.
        backend: String,
    },

    /// Set the report interval.
    Interval {
        /// Cadence: manual, 30s, 1m, 5m, 15m.
        cadence: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli),
        ConfigAction::Server { url } => set_server(url).await,
        ConfigAction::Background { state } => set_background(state).await,
        ConfigAction::Backend { backend } => set_backend(backend).await,
        ConfigAction::Interval { cadence } => set_interval(cadence).await,
        ConfigAction::Reset => reset_config().await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    let settings = store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_settings(&settings));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = default_settings_path();
    let credentials_path = default_credentials_path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:       {}", config_dir.display());
            println!("Settings file:    {}", settings_path.display());
            println!("Credentials file: {}", credentials_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "credentials_file": credentials_path.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_server(url: &str) -> Result<()> {
    let store = SettingsStore::load_default().await?;
    store.set_server_url(url).await?;
    store.save().await?;

    let url = store.server_url().await;
    info!(server = %url, "Server updated");
    println!("Server set to: {url}");

    Ok(())
}

async fn set_background(state: &str) -> Result<()> {
    let enabled = parse_switch(state)?;

    let store = SettingsStore::load_default().await?;
    store.set_background_enabled(enabled).await;
    store.save().await?;

    info!(enabled, "Background reporting updated");
    println!("Background reporting: {}", if enabled { "on" } else { "off" });

    Ok(())
}

async fn set_backend(backend: &str) -> Result<()> {
    let backend: CredentialBackendKind = backend.parse()?;

    let store = SettingsStore::load_default().await?;
    store.set_credential_backend(backend).await;
    store.save().await?;

    info!(%backend, "Credential backend updated");
    println!("Credential backend set to: {backend} (log in again to store a session there)");

    Ok(())
}

async fn set_interval(cadence: &str) -> Result<()> {
    let interval = parse_interval(cadence)?;

    let store = SettingsStore::load_default().await?;
    store.set_report_interval(interval).await;
    store.save().await?;

    info!(interval = %interval, "Report interval updated");
    println!("Report interval set to: {interval}");

    Ok(())
}

async fn reset_config() -> Result<()> {
    let path = default_settings_path();

    if remove_file(&path).await? {
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => bail!("Unknown value: {value}. Use: on, off"),
    }
}

fn parse_interval(cadence: &str) -> Result<ReportInterval> {
    Ok(match cadence.to_lowercase().as_str() {
        "manual" => ReportInterval::Manual,
        "30s" | "30" => ReportInterval::ThirtySeconds,
        "1m" | "1" | "60" => ReportInterval::OneMinute,
        "5m" | "5" => ReportInterval::FiveMinutes,
        "15m" | "15" => ReportInterval::FifteenMinutes,
        _ => bail!("Unknown interval: {cadence}. Use: manual, 30s, 1m, 5m, 15m"),
    })
}
