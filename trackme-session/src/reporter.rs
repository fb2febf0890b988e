//! Reporter: connects a location feed to the session manager.
//!
//! The feed runs only while the gate is open, that is while background
//! reporting is enabled and the session is not `LoggedOut`. Every sample
//! becomes its own submission task, so a slow request never delays the
//! next sample.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use trackme_core::{Acknowledgement, LocationFeed, SessionState};

use crate::error::SessionError;
use crate::manager::SessionManager;

/// Counts of finished submissions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Acknowledged samples.
    pub submitted: u64,
    /// Failed submissions.
    pub failed: u64,
    /// Submissions aborted by shutdown.
    pub aborted: u64,
}

/// Whether the feed may run.
pub fn gate_open(background_enabled: bool, state: SessionState) -> bool {
    background_enabled && state.is_authenticated()
}

/// Drives a [`LocationFeed`] into a [`SessionManager`].
pub struct Reporter<F> {
    manager: Arc<SessionManager>,
    feed: F,
    background: watch::Receiver<bool>,
}

impl<F: LocationFeed> Reporter<F> {
    /// Creates a reporter. `background` carries the background reporting
    /// preference.
    pub fn new(manager: Arc<SessionManager>, feed: F, background: watch::Receiver<bool>) -> Self {
        Self {
            manager,
            feed,
            background,
        }
    }

    /// Runs until the feed ends or `shutdown` resolves.
    ///
    /// When the feed ends, in-flight submissions are awaited. On shutdown
    /// they are aborted.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> ReportSummary {
        let Reporter {
            manager,
            mut feed,
            mut background,
        } = self;
        let mut state = manager.subscribe_state();
        let mut background_open = true;
        let mut state_open = true;
        let mut tasks: JoinSet<Result<Acknowledgement, SessionError>> = JoinSet::new();
        let mut summary = ReportSummary::default();

        tokio::pin!(shutdown);

        loop {
            let open = gate_open(*background.borrow_and_update(), *state.borrow_and_update());
            if open && !feed.is_running() {
                info!("Reporting gate opened, starting feed");
                feed.start();
            } else if !open && feed.is_running() {
                info!("Reporting gate closed, stopping feed");
                feed.stop();
            }
            let running = feed.is_running();

            tokio::select! {
                () = &mut shutdown => {
                    debug!(in_flight = tasks.len(), "Reporter shutting down");
                    feed.stop();
                    summary.aborted += tasks.len() as u64;
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    return summary;
                }
                changed = background.changed(), if background_open => {
                    background_open = changed.is_ok();
                }
                changed = state.changed(), if state_open => {
                    state_open = changed.is_ok();
                }
                sample = feed.next_sample(), if running => {
                    let Some(sample) = sample else {
                        debug!("Feed exhausted");
                        break;
                    };
                    if gate_open(*background.borrow(), manager.state()) {
                        let manager = Arc::clone(&manager);
                        tasks.spawn(async move { manager.submit_location(sample).await });
                    } else {
                        debug!(%sample, "Gate closed, dropping sample");
                    }
                }
                Some(joined) = tasks.join_next() => {
                    record(&mut summary, joined);
                }
            }
        }

        feed.stop();
        while let Some(joined) = tasks.join_next().await {
            record(&mut summary, joined);
        }
        info!(
            submitted = summary.submitted,
            failed = summary.failed,
            "Reporter finished"
        );
        summary
    }
}

fn record(
    summary: &mut ReportSummary,
    joined: Result<Result<Acknowledgement, SessionError>, tokio::task::JoinError>,
) {
    match joined {
        Ok(Ok(ack)) => {
            debug!(sample = %ack.sample, "Sample reported");
            summary.submitted += 1;
        }
        Ok(Err(SessionError::Cancelled)) => summary.aborted += 1,
        Ok(Err(e)) => {
            debug!(error = %e, "Sample not reported");
            summary.failed += 1;
        }
        Err(e) if e.is_cancelled() => summary.aborted += 1,
        Err(e) => {
            warn!(error = %e, "Submission task panicked");
            summary.failed += 1;
        }
    }
}
