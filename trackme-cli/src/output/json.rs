//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use trackme_core::{Acknowledgement, SessionState};
use trackme_session::{ReportSummary, SessionErrorKind};

// ============================================================================
// Output Types
// ============================================================================

/// Session status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub server: String,
    pub background_enabled: bool,
    pub credential_backend: String,
    pub reporting: bool,
}

/// A reported sample.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOutput {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(serialize_with = "serialize_datetime")]
    pub observed_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_datetime")]
    pub acknowledged_at: DateTime<Utc>,
}

impl From<&Acknowledgement> for ReportOutput {
    fn from(ack: &Acknowledgement) -> Self {
        Self {
            latitude: ack.sample.latitude(),
            longitude: ack.sample.longitude(),
            observed_at: ack.sample.observed_at(),
            acknowledged_at: ack.acknowledged_at,
        }
    }
}

/// A failed command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionErrorKind>,
    pub retryable: bool,
}

/// End of a watch run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub submitted: u64,
    pub failed: u64,
    pub aborted: u64,
}

impl From<ReportSummary> for SummaryOutput {
    fn from(summary: ReportSummary) -> Self {
        Self {
            submitted: summary.submitted,
            failed: summary.failed,
            aborted: summary.aborted,
        }
    }
}

// ============================================================================
// Serialization helpers
// ============================================================================

fn serialize_datetime<S>(dt: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&dt.to_rfc3339())
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
