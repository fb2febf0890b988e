//! Report command - submit one position now.

use anyhow::Result;
use clap::Args;
use trackme_core::LocationSample;
use trackme_session::SessionError;

use crate::context::AppContext;
use crate::output::{ErrorOutput, JsonFormatter, ReportOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the report command.
#[derive(Args)]
pub struct ReportArgs {
    /// Latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

/// Runs the report command.
pub async fn run(args: &ReportArgs, cli: &Cli) -> Result<()> {
    let sample = LocationSample::now(args.lat, args.lon).map_err(SessionError::from)?;
    let ctx = AppContext::open(cli).await?;

    match ctx.manager.submit_location(sample).await {
        Ok(ack) => {
            match cli.format {
                OutputFormat::Text => {
                    if !cli.quiet {
                        println!("{}", TextFormatter::new(!cli.no_color).format_ack(&ack));
                    }
                }
                OutputFormat::Json => {
                    let output = ReportOutput::from(&ack);
                    println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
                }
            }
            Ok(())
        }
        Err(e) => {
            if cli.format == OutputFormat::Json {
                let output = ErrorOutput {
                    error: e.to_string(),
                    kind: Some(e.kind()),
                    retryable: e.is_retryable(),
                };
                println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
            }
            Err(e.into())
        }
    }
}
