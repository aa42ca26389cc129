//! Append-only JSONL log of user interactions.
//!
//! Every query gets one record with its latency and outcome so sessions can be
//! inspected after the fact. Logging failures are reported but never interrupt
//! the query loop.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Default location of the interaction log.
pub const INTERACTION_LOG: &str = "logs/interactions.jsonl";

/// One logged query/response exchange.
#[derive(Debug, Serialize)]
pub struct InteractionRecord<'a> {
    /// RFC3339 timestamp of the exchange.
    pub timestamp: String,
    /// The user's query text.
    pub query: &'a str,
    /// Number of retrieval results used for the response.
    pub result_count: usize,
    /// The response shown to the user.
    pub response: &'a str,
    /// End-to-end latency of the exchange in milliseconds.
    pub elapsed_ms: u128,
    /// Error message when the exchange failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Append one interaction record to the log at `path`.
pub fn log_interaction(
    path: &Path,
    query: &str,
    result_count: usize,
    response: &str,
    elapsed: Duration,
    error: Option<&str>,
) {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let record = InteractionRecord {
        timestamp,
        query,
        result_count,
        response,
        elapsed_ms: elapsed.as_millis(),
        error,
    };

    if let Err(err) = append_record(path, &record) {
        tracing::warn!(error = %err, "Failed to write interaction log");
    }
}

fn append_record(path: &Path, record: &InteractionRecord<'_>) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let line = serde_json::to_string(record)?;
    writeln!(file, "{line}")
}
