//! Location feeds.
//!
//! - [`ChannelFeed`] - samples pushed through a [`FeedHandle`]
//! - [`IntervalFeed`] - a fixed position on a timer
//! - [`LineFeed`] - `lat,lon` lines from any async reader (stdin)

use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, warn};
use trackme_core::{LocationFeed, LocationSample};

// ============================================================================
// Channel Feed
// ============================================================================

/// Feed backed by an unbounded channel.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: mpsc::UnboundedReceiver<LocationSample>,
    running: bool,
}

/// Sending side of a [`ChannelFeed`]. Dropping every handle ends the feed.
#[derive(Debug, Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<LocationSample>,
}

impl FeedHandle {
    /// Pushes a sample. Returns false if the feed is gone.
    pub fn push(&self, sample: LocationSample) -> bool {
        self.tx.send(sample).is_ok()
    }
}

impl ChannelFeed {
    /// Creates a stopped feed and its handle.
    pub fn channel() -> (Self, FeedHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, running: false }, FeedHandle { tx })
    }
}

impl LocationFeed for ChannelFeed {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn next_sample(&mut self) -> Option<LocationSample> {
        loop {
            let sample = self.rx.recv().await?;
            if self.running {
                return Some(sample);
            }
            debug!(%sample, "Feed stopped, dropping sample");
        }
    }
}

// ============================================================================
// Interval Feed
// ============================================================================

/// Reports one fixed position every tick.
#[derive(Debug)]
pub struct IntervalFeed {
    latitude: f64,
    longitude: f64,
    period: Duration,
    interval: Option<Interval>,
    remaining: Option<u64>,
}

impl IntervalFeed {
    /// Creates a stopped feed. The first sample comes right after `start`.
    pub fn new(latitude: f64, longitude: f64, period: Duration) -> Self {
        Self {
            latitude,
            longitude,
            period,
            interval: None,
            remaining: None,
        }
    }

    /// Ends the feed after `count` samples.
    #[must_use]
    pub fn with_limit(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }
}

impl LocationFeed for IntervalFeed {
    fn start(&mut self) {
        if self.interval.is_none() {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
        }
    }

    fn stop(&mut self) {
        self.interval = None;
    }

    fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    async fn next_sample(&mut self) -> Option<LocationSample> {
        loop {
            if self.remaining == Some(0) {
                return None;
            }
            let Some(interval) = self.interval.as_mut() else {
                // Stopped feeds never yield; callers select on something else.
                std::future::pending::<()>().await;
                continue;
            };
            interval.tick().await;
            match LocationSample::now(self.latitude, self.longitude) {
                Ok(sample) => {
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                    return Some(sample);
                }
                Err(e) => {
                    warn!(error = %e, "Configured position is invalid, ending feed");
                    return None;
                }
            }
        }
    }
}

// ============================================================================
// Line Feed
// ============================================================================

/// Reads `lat,lon` per line. Blank lines and `#` comments are skipped; bad
/// lines are logged and skipped. Ends at EOF.
#[derive(Debug)]
pub struct LineFeed<R> {
    lines: Lines<R>,
    running: bool,
}

impl<R: AsyncBufRead + Unpin + Send> LineFeed<R> {
    /// Creates a stopped feed over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            running: false,
        }
    }
}

impl<R: AsyncBufRead + Unpin + Send> LocationFeed for LineFeed<R> {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    async fn next_sample(&mut self) -> Option<LocationSample> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Failed to read samples");
                    return None;
                }
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match LocationSample::parse_pair(line) {
                Ok(sample) if self.running => return Some(sample),
                Ok(sample) => debug!(%sample, "Feed stopped, dropping sample"),
                Err(e) => warn!(line, error = %e, "Skipping unreadable sample"),
            }
        }
    }
}
