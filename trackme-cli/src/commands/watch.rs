//! Watch command - keep reporting until interrupted.

use anyhow::{Result, bail};
use clap::Args;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};
use trackme_core::{LocationFeed, SessionState};
use trackme_session::{
    IntervalFeed, LineFeed, ReportSummary, Reporter, SessionEvent, StatusBoard,
};

use crate::context::AppContext;
use crate::output::{JsonFormatter, SummaryOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Latitude of a fixed position to report.
    #[arg(long, allow_negative_numbers = true, requires = "lon", conflicts_with = "stdin")]
    pub lat: Option<f64>,

    /// Longitude of a fixed position to report.
    #[arg(long, allow_negative_numbers = true, requires = "lat", conflicts_with = "stdin")]
    pub lon: Option<f64>,

    /// Seconds between reports of a fixed position. Defaults to the
    /// configured report interval.
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Stop after this many reports of a fixed position.
    #[arg(long, short = 'n')]
    pub count: Option<u64>,

    /// Read "lat,lon" lines from stdin instead.
    #[arg(long)]
    pub stdin: bool,

    /// Report even when background reporting is disabled.
    #[arg(long)]
    pub force: bool,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli) -> Result<()> {
    let ctx = AppContext::open(cli).await?;

    if args.stdin {
        let feed = LineFeed::new(BufReader::new(tokio::io::stdin()));
        return watch_feed(feed, &ctx, args, cli).await;
    }

    let (Some(lat), Some(lon)) = (args.lat, args.lon) else {
        bail!("Give a position with --lat and --lon, or use --stdin");
    };
    let period = match args.interval {
        Some(0) => bail!("Interval must be at least one second"),
        Some(secs) => Duration::from_secs(secs),
        None => match ctx.settings.report_interval.as_duration() {
            Some(period) => period,
            None => bail!("Report interval is manual; pass --interval or use 'trackme report'"),
        },
    };

    let mut feed = IntervalFeed::new(lat, lon, period);
    if let Some(count) = args.count {
        feed = feed.with_limit(count);
    }
    watch_feed(feed, &ctx, args, cli).await
}

async fn watch_feed<F: LocationFeed>(
    feed: F,
    ctx: &AppContext,
    args: &WatchArgs,
    cli: &Cli,
) -> Result<()> {
    let background = args.force || ctx.settings.background_enabled;
    if !cli.quiet {
        if !background {
            eprintln!("Background reporting is off; waiting (enable it with 'trackme config background on' or pass --force)");
        }
        if ctx.manager.state() == SessionState::LoggedOut {
            eprintln!("Not logged in; waiting (run 'trackme login')");
        }
    }

    // Held for the whole run so the reporter sees a live preference.
    let (_background_tx, background_rx) = watch::channel(background);
    let events = ctx.manager.subscribe_events();
    let reporter = Reporter::new(ctx.manager.clone(), feed, background_rx);

    let manager = ctx.manager.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Interrupted, shutting down");
        manager.shutdown();
    };

    info!(background, force = args.force, "Watching");
    let printer = Printer::new(ctx, cli);
    let summary = printer.drive(reporter.run_until(shutdown), events).await;

    printer.finish(summary)
}

// ============================================================================
// Printer
// ============================================================================

/// Prints events while the reporter runs.
struct Printer<'a> {
    cli: &'a Cli,
    text: TextFormatter,
    json: JsonFormatter,
    board: StatusBoard,
}

impl<'a> Printer<'a> {
    fn new(ctx: &AppContext, cli: &'a Cli) -> Self {
        Self {
            cli,
            text: TextFormatter::new(!cli.no_color),
            json: JsonFormatter::new(cli.pretty),
            board: StatusBoard::new(ctx.settings.status_fade()),
        }
    }

    async fn drive(
        &self,
        run: impl Future<Output = ReportSummary>,
        mut events: broadcast::Receiver<SessionEvent>,
    ) -> ReportSummary {
        let mut status = self.board.subscribe();
        tokio::pin!(run);

        let summary = loop {
            tokio::select! {
                summary = &mut run => break summary,
                Ok(event) = events.recv() => self.event(&event),
                Ok(()) = status.changed() => {
                    let text = status.borrow_and_update().clone();
                    self.status(&text);
                }
            }
        };

        while let Ok(event) = events.try_recv() {
            self.event(&event);
        }
        summary
    }

    fn event(&self, event: &SessionEvent) {
        if self.cli.quiet {
            return;
        }
        match self.cli.format {
            OutputFormat::Json => match self.json.format(event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Cannot encode event"),
            },
            OutputFormat::Text if self.cli.verbose => {
                if let Some(line) = self.text.format_event(event) {
                    println!("{line}");
                }
            }
            OutputFormat::Text => {
                if matches!(event, SessionEvent::LoggedOut { .. }) {
                    println!("{}", self.text.format_event(event).unwrap_or_default());
                }
                self.board.apply(event);
            }
        }
    }

    fn status(&self, text: &str) {
        if !self.cli.quiet && !text.is_empty() && self.cli.format == OutputFormat::Text {
            println!("{text}");
        }
    }

    fn finish(&self, summary: ReportSummary) -> Result<()> {
        let output = SummaryOutput::from(summary);
        match self.cli.format {
            OutputFormat::Text => {
                if !self.cli.quiet {
                    println!("{}", self.text.format_summary(&output));
                }
            }
            OutputFormat::Json => println!("{}", self.json.format(&output)?),
        }
        Ok(())
    }
}
