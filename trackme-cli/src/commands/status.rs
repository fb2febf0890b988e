//! Status command - show the current session.

use anyhow::Result;
use trackme_session::gate_open;

use crate::context::AppContext;
use crate::output::{JsonFormatter, StatusOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the status command.
pub async fn run(cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;
    print_status(&ctx, cli).await
}

/// Collects the status of an opened context.
pub async fn status_output(ctx: &AppContext) -> Result<StatusOutput> {
    let state = ctx.manager.state();
    Ok(StatusOutput {
        state,
        username: ctx.manager.username().await?,
        server: ctx.server_url.clone(),
        background_enabled: ctx.settings.background_enabled,
        credential_backend: ctx.backend_label(),
        reporting: gate_open(ctx.settings.background_enabled, state),
    })
}

/// Prints the status of an opened context.
pub async fn print_status(ctx: &AppContext, cli: &Cli) -> Result<()> {
    let status = status_output(ctx).await?;
    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", TextFormatter::new(!cli.no_color).format_status(&status));
            }
        }
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&status)?);
        }
    }
    Ok(())
}
