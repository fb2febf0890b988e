// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! TrackMe CLI - authenticated location reporting from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Log in (password read from stdin when not given)
//! trackme login alice
//!
//! # Session status
//! trackme status
//!
//! # Report one position now
//! trackme report --lat 55.6 --lon 12.5
//!
//! # Report a fixed position every 30 seconds
//! trackme watch --lat 55.6 --lon 12.5 --interval 30
//!
//! # Report positions read from stdin, one "lat,lon" per line
//! gps-reader | trackme watch --stdin
//!
//! # Enable background reporting
//! trackme config background on
//! ```

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use trackme_session::SessionError;
use trackme_store::{LogLevel, SettingsStore};

use commands::{config, login, report, status, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// TrackMe CLI - authenticated location reporting.
#[derive(Parser)]
#[command(name = "trackme")]
#[command(about = "Authenticated location reporting client")]
#[command(long_about = r#"
TrackMe reports this device's location to a tracking server.

Log in once; the session is kept between runs and refreshed automatically
when the server rejects an expired access token.

Examples:
  trackme login alice                      # Log in
  trackme report --lat 55.6 --lon 12.5     # Report one position
  trackme watch --stdin                    # Report "lat,lon" lines from stdin
  trackme config background on             # Allow continuous reporting
"#)]
#[command(version)]
#[command(author = "TrackMe Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'status'.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Server base URL for this run.
    #[arg(long, short, global = true)]
    pub server: Option<String>,

    /// Keep credentials in memory only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Log in and store the session.
    Login(login::LoginArgs),

    /// Log out and forget the session.
    Logout,

    /// Show session status (default if no command specified).
    #[command(visible_alias = "s")]
    Status,

    /// Report one position now.
    #[command(visible_alias = "r")]
    Report(report::ReportArgs),

    /// Keep reporting positions until interrupted.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No session.
    NotLoggedIn = 2,
    /// The server rejected the credentials.
    Unauthorized = 3,
    /// The server could not be reached.
    Network = 4,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        match error.downcast_ref::<SessionError>() {
            Some(SessionError::NotAuthenticated) => ExitCode::NotLoggedIn,
            Some(SessionError::SessionExpired | SessionError::LoginRejected { status: 401 }) => {
                ExitCode::Unauthorized
            }
            Some(SessionError::Transport(_)) => ExitCode::Network,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("trackme=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("trackme={level}")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configured level; RUST_LOG and --verbose take precedence.
    let level = match SettingsStore::load_default().await {
        Ok(store) => store.get().await.log_level,
        Err(_) => LogLevel::default(),
    };
    setup_logging(cli.verbose, cli.quiet, level);

    let result = match &cli.command {
        Some(Commands::Login(args)) => login::run(args, &cli).await,
        Some(Commands::Logout) => login::logout(&cli).await,
        Some(Commands::Status) | None => status::run(&cli).await,
        Some(Commands::Report(args)) => report::run(args, &cli).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
