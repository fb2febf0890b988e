//! Status indicator text.
//!
//! Mirrors submission progress as one line of text:
//!
//! - `Updating...` while a submission runs
//! - `Last updated: HH:MM:SS` (local time) after a success
//! - `Update failed.` or `Unauthorized.` after a failure, fading back to
//!   the last success text (or nothing) after a configurable delay

use chrono::{DateTime, Local, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::error::SessionErrorKind;
use crate::events::SessionEvent;

/// Shown while a submission is in flight.
pub const UPDATING: &str = "Updating...";
/// Shown after a non-auth failure.
pub const UPDATE_FAILED: &str = "Update failed.";
/// Shown after an auth failure.
pub const UNAUTHORIZED: &str = "Unauthorized.";

/// Formats a success line in local time.
pub fn last_updated_text(at: DateTime<Utc>) -> String {
    format!("Last updated: {}", at.with_timezone(&Local).format("%H:%M:%S"))
}

#[derive(Debug, Default)]
struct Board {
    generation: u64,
    last_success: Option<String>,
}

struct Inner {
    text: watch::Sender<String>,
    board: Mutex<Board>,
    fade: Duration,
}

/// Observable status line. Cheap to clone.
#[derive(Clone)]
pub struct StatusBoard {
    inner: Arc<Inner>,
}

impl StatusBoard {
    /// Creates an empty board whose failure messages fade after `fade`.
    pub fn new(fade: Duration) -> Self {
        let (text, _) = watch::channel(String::new());
        Self {
            inner: Arc::new(Inner {
                text,
                board: Mutex::new(Board::default()),
                fade,
            }),
        }
    }

    /// Returns the current text.
    pub fn text(&self) -> String {
        self.inner.text.borrow().clone()
    }

    /// Subscribes to text changes.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.inner.text.subscribe()
    }

    /// A submission started.
    pub fn updating(&self) {
        self.show(UPDATING.to_string(), None);
    }

    /// A submission was acknowledged at `at`.
    pub fn succeeded(&self, at: DateTime<Utc>) {
        let line = last_updated_text(at);
        self.show(line.clone(), Some(line));
    }

    /// A submission failed. Must be called inside a tokio runtime.
    pub fn failed(&self, kind: SessionErrorKind) {
        let message = if kind.is_auth_failure() {
            UNAUTHORIZED
        } else {
            UPDATE_FAILED
        };
        let generation = self.show(message.to_string(), None);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.fade).await;
            let board = inner.board.lock().unwrap_or_else(PoisonError::into_inner);
            if board.generation == generation {
                debug!("Fading status message");
                inner
                    .text
                    .send_replace(board.last_success.clone().unwrap_or_default());
            }
        });
    }

    /// Applies a session event.
    pub fn apply(&self, event: &SessionEvent) {
        match event {
            SessionEvent::SubmissionStarted { .. } => self.updating(),
            SessionEvent::LocationSubmitted { ack } => self.succeeded(ack.acknowledged_at),
            SessionEvent::SubmissionFailed { kind, .. } if *kind != SessionErrorKind::Cancelled => {
                self.failed(*kind);
            }
            _ => {}
        }
    }

    /// Follows an event stream until it closes.
    pub async fn follow(self, mut events: broadcast::Receiver<SessionEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.apply(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Status board lagged behind events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Sets the text, records a new success line if given, and returns the
    /// new generation.
    fn show(&self, text: String, success: Option<String>) -> u64 {
        let mut board = self.inner.board.lock().unwrap_or_else(PoisonError::into_inner);
        board.generation += 1;
        if success.is_some() {
            board.last_success = success;
        }
        self.inner.text.send_replace(text);
        board.generation
    }
}

impl std::fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBoard")
            .field("text", &self.text())
            .field("fade", &self.inner.fade)
            .finish()
    }
}
