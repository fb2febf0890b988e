//! Output formatting for CLI.

mod json;
mod text;

pub use json::{ErrorOutput, JsonFormatter, ReportOutput, StatusOutput, SummaryOutput};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
