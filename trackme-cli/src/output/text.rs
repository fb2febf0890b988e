//! Text output formatting with colors.

use trackme_core::{Acknowledgement, SessionState};
use trackme_session::SessionEvent;
use trackme_session::status::last_updated_text;
use trackme_store::Settings;

use super::json::{StatusOutput, SummaryOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats session status.
    pub fn format_status(&self, status: &StatusOutput) -> String {
        let mut lines = Vec::new();

        let state = self.color_for_state(status.state, &status.state.to_string());
        match &status.username {
            Some(username) => lines.push(format!("{} as {}", state, self.bold(username))),
            None => lines.push(state),
        }

        lines.push(format!("Server:     {}", self.cyan(&status.server)));
        lines.push(format!("Credentials: {}", status.credential_backend));
        let background = if status.background_enabled { "on" } else { "off" };
        lines.push(format!("Background: {background}"));
        if !status.reporting {
            lines.push(self.dim("Reporting is paused (log in and enable background reporting)"));
        }

        lines.join("\n")
    }

    /// Formats a successful report.
    pub fn format_ack(&self, ack: &Acknowledgement) -> String {
        format!(
            "{} Reported {}\n{}",
            self.green("✓"),
            ack.sample,
            last_updated_text(ack.acknowledged_at)
        )
    }

    /// Formats one session event for watch output. Returns None for
    /// events not worth a line.
    pub fn format_event(&self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::SubmissionStarted { .. } => None,
            SessionEvent::LocationSubmitted { ack } => Some(format!(
                "{} {} {}",
                self.green("✓"),
                ack.sample,
                self.dim(&last_updated_text(ack.acknowledged_at))
            )),
            SessionEvent::SubmissionFailed { kind, message } if kind.is_auth_failure() => {
                Some(format!("{} {}", self.red("✗ Unauthorized."), self.dim(message)))
            }
            SessionEvent::SubmissionFailed { message, .. } => {
                Some(format!("{} {}", self.yellow("✗ Update failed."), self.dim(message)))
            }
            SessionEvent::CredentialsRefreshed => Some(self.dim("Credentials refreshed")),
            SessionEvent::LoggedIn { username } => Some(format!("Logged in as {}", self.bold(username))),
            SessionEvent::LoggedOut { reason } if reason.is_forced() => Some(self.red(&format!(
                "Logged out: {reason} (run 'trackme login' to continue)"
            ))),
            SessionEvent::LoggedOut { reason } => Some(format!("Logged out: {reason}")),
        }
    }

    /// Formats the end of a watch run.
    pub fn format_summary(&self, summary: &SummaryOutput) -> String {
        let mut text = format!("{} reported", summary.submitted);
        if summary.failed > 0 {
            text.push_str(&format!(", {}", self.yellow(&format!("{} failed", summary.failed))));
        }
        if summary.aborted > 0 {
            text.push_str(&format!(", {} interrupted", summary.aborted));
        }
        text
    }

    /// Formats settings.
    pub fn format_settings(&self, settings: &Settings) -> String {
        let effective = settings.effective_server_url();
        let mut server = settings.server_url.clone();
        if effective != settings.server_url {
            server = format!("{} {}", effective, self.dim("(from TRACKME_SERVER_URL)"));
        }

        [
            self.bold("TrackMe Configuration"),
            "─".repeat(40),
            format!("Server:              {server}"),
            format!("Background:          {}", if settings.background_enabled { "on" } else { "off" }),
            format!("Credential backend:  {}", settings.credential_backend),
            format!("Report interval:     {}", settings.report_interval),
            format!("Request timeout:     {}s", settings.request_timeout_secs),
            format!("Status fade:         {}s", settings.status_fade_secs),
            format!("Log level:           {}", settings.log_level),
        ]
        .join("\n")
    }

    /// Formats an error.
    pub fn format_error(&self, error: &str) -> String {
        format!("{} {}", self.red("Error:"), error)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn color_for_state(&self, state: SessionState, text: &str) -> String {
        match state {
            SessionState::LoggedIn => self.green(text),
            SessionState::RefreshingCredentials => self.yellow(text),
            SessionState::LoggedOut => self.red(text),
        }
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}
