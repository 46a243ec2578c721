// agent-router-server/src/handlers/estimate.rs
// ============================================================================
// Module: Estimate Run Recording
// Description: Validated estimate-run records appended to the audit log.
// Purpose: Serve the frozen `estimate_record_run` tool.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Estimate runs land in the same JSON-lines log as dispatch records. The
//! tool is frozen, so it is refused unless the contract handshake passed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use crate::audit::EstimateRunRecord;
use crate::audit::utc_timestamp;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// Tool name recorded on estimate runs.
const TOOL_NAME: &str = "estimate_record_run";

/// `estimate_record_run` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecordArgs {
    /// Project identifier.
    project_id: String,
    /// Source document identifier.
    document_id: String,
    /// Estimate total.
    estimate_total: f64,
    /// Confidence in `[0, 1]`.
    confidence: f64,
    /// Producing model version.
    model_version: String,
    /// Additional context.
    #[serde(default)]
    extra: Option<Map<String, Value>>,
}

impl RecordArgs {
    /// Validates field contents.
    fn validate(&self) -> Result<(), HandlerError> {
        for (field, value) in [
            ("project_id", &self.project_id),
            ("document_id", &self.document_id),
            ("model_version", &self.model_version),
        ] {
            if value.trim().is_empty() {
                return Err(HandlerError::InvalidInput(format!("{field} must be non-empty")));
            }
        }
        if !self.estimate_total.is_finite() || self.estimate_total < 0.0 {
            return Err(HandlerError::InvalidInput(
                "estimate_total must be a non-negative number".to_string(),
            ));
        }
        if !(0.0 ..= 1.0).contains(&self.confidence) {
            return Err(HandlerError::InvalidInput(format!(
                "confidence must be between 0 and 1, got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Registers `estimate_record_run`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let audit = services.audit.clone();
    registry.register(
        ToolDefinition::new(
            TOOL_NAME,
            "Record a completed estimate run (totals, confidence, model version) to the audit log.",
            json!({
                "type": "object",
                "properties": {
                    "project_id": {"type": "string"},
                    "document_id": {"type": "string"},
                    "estimate_total": {"type": "number", "minimum": 0},
                    "confidence": {"type": "number", "minimum": 0, "maximum": 1},
                    "model_version": {"type": "string"},
                    "extra": {"type": "object"}
                },
                "required": ["project_id", "document_id", "estimate_total", "confidence", "model_version"]
            }),
        )
        .frozen(),
        move |arguments: Value| {
            let args: RecordArgs = parse_args(arguments)?;
            args.validate()?;
            let record = EstimateRunRecord {
                timestamp: utc_timestamp(),
                project_id: args.project_id,
                document_id: args.document_id,
                estimate_total: args.estimate_total,
                confidence: args.confidence,
                model_version: args.model_version,
                tool_name: TOOL_NAME.to_string(),
                extra: args.extra,
            };
            audit.record_estimate_run(&record);
            Ok(json!({"ok": true, "recorded": record}))
        },
    );
}
