//! Login and logout commands.

use anyhow::{Context as _, Result, bail};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use super::status::print_status;
use crate::Cli;
use crate::context::AppContext;

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Account name.
    pub username: String,

    /// Password. Read from the first line of stdin when omitted.
    #[arg(long, short)]
    pub password: Option<String>,
}

/// Runs the login command.
pub async fn run(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let username = args.username.trim();
    if username.is_empty() {
        bail!("Username must not be empty");
    }

    let password = match &args.password {
        Some(password) => password.clone(),
        None => read_password().await?,
    };

    let ctx = AppContext::open(cli).await?;
    ctx.manager.login(username, &password).await?;
    info!(username, "Logged in");

    print_status(&ctx, cli).await
}

/// Runs the logout command.
pub async fn logout(cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    ctx.manager.logout().await?;
    info!("Logged out");

    print_status(&ctx, cli).await
}

async fn read_password() -> Result<String> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read password from stdin")?;

    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("No password given (use --password or pipe it on stdin)");
    }
    Ok(password.to_string())
}
