// agent-router-server/src/audit.rs
// ============================================================================
// Module: Audit Log
// Description: Append-only JSONL records of tool calls and estimate runs.
// Purpose: Keep a durable execution trail without making it a failure point.
// Dependencies: serde, serde_json, time, tracing
// ============================================================================

//! ## Overview
//! Audit records are written one JSON object per line to
//! `<dir>/estimate_runs.jsonl`. Writes are serialized through a mutex so
//! concurrent dispatches never interleave partial lines. Every write failure
//! (missing directory, full disk, serialization) is logged and swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit file name inside the audit directory.
pub const AUDIT_FILE_NAME: &str = "estimate_runs.jsonl";

// ============================================================================
// SECTION: Records
// ============================================================================

/// One dispatch outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    /// UTC timestamp, RFC 3339.
    pub timestamp: String,
    /// Tool name as requested.
    pub tool_name: String,
    /// Whether the call succeeded.
    pub ok: bool,
    /// Error code for failed calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Elapsed milliseconds, two decimals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Additional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

impl ToolCallRecord {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(tool_name: &str, ok: bool, error_code: Option<&str>, duration_ms: f64) -> Self {
        Self {
            timestamp: utc_timestamp(),
            tool_name: tool_name.to_string(),
            ok,
            error_code: error_code.map(str::to_string),
            duration_ms: Some((duration_ms * 100.0).round() / 100.0),
            extra: None,
        }
    }
}

/// One estimate run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateRunRecord {
    /// UTC timestamp, RFC 3339.
    pub timestamp: String,
    /// Project identifier.
    pub project_id: String,
    /// Source document identifier.
    pub document_id: String,
    /// Estimate total.
    pub estimate_total: f64,
    /// Estimate confidence in `[0, 1]`.
    pub confidence: f64,
    /// Model version that produced the estimate.
    pub model_version: String,
    /// Tool that recorded the run.
    pub tool_name: String,
    /// Additional context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Destination for audit records. Implementations must never fail the caller.
pub trait AuditSink: Send + Sync {
    /// Records a dispatch outcome.
    fn record_tool_call(&self, record: &ToolCallRecord);

    /// Records an estimate run.
    fn record_estimate_run(&self, record: &EstimateRunRecord);
}

/// Appends records to `<dir>/estimate_runs.jsonl`.
pub struct FileAuditSink {
    /// Audit directory, created on demand.
    dir: PathBuf,
    /// Serializes appends.
    lock: Mutex<()>,
}

impl FileAuditSink {
    /// Creates a sink writing under `dir`. Nothing touches disk until the first record.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the audit file path.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(AUDIT_FILE_NAME)
    }

    /// Serializes and appends one record.
    fn append<T: Serialize>(&self, record: &T) {
        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                error!(error = %err, "failed to serialize audit record");
                return;
            }
        };
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = fs::create_dir_all(&self.dir) {
            error!(dir = %self.dir.display(), error = %err, "cannot create audit log directory");
            return;
        }
        if let Err(err) = append_line(&self.path(), &line) {
            error!(error = %err, "failed to write audit log");
        }
    }
}

impl AuditSink for FileAuditSink {
    fn record_tool_call(&self, record: &ToolCallRecord) {
        self.append(record);
    }

    fn record_estimate_run(&self, record: &EstimateRunRecord) {
        self.append(record);
    }
}

/// Discards every record.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record_tool_call(&self, _record: &ToolCallRecord) {}

    fn record_estimate_run(&self, _record: &EstimateRunRecord) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current UTC time in RFC 3339 form.
#[must_use]
pub fn utc_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

/// Appends `line` plus a newline to `path`.
fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.flush()
}
