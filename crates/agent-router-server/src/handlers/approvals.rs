// agent-router-server/src/handlers/approvals.rs
// ============================================================================
// Module: Approvals
// Description: Human approval requests for risky agent actions.
// Purpose: Record pending approvals and report their status.
// Dependencies: serde, serde_json, uuid
// ============================================================================

//! ## Overview
//! Approvals are held in memory for the lifetime of the process. A request
//! always starts `pending`; deciding it happens outside the router.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::PoisonError;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use uuid::Uuid;

use super::ToolServices;
use crate::audit::utc_timestamp;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Declared risk of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
}

/// Approval lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved.
    Approved,
    /// Rejected.
    Rejected,
}

/// Stored approval request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Approval identifier.
    pub approval_id: String,
    /// Action awaiting approval.
    pub action: String,
    /// Human-readable summary.
    pub summary: String,
    /// Declared risk.
    pub risk: RiskLevel,
    /// Supporting artifact references.
    pub artifacts: Vec<String>,
    /// Current state.
    pub status: ApprovalStatus,
    /// Creation time (RFC 3339).
    pub created_at: String,
    /// Decision time (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<String>,
}

/// In-memory approval store.
#[derive(Debug, Default)]
pub struct ApprovalStore {
    /// Records keyed by approval id.
    records: Mutex<BTreeMap<String, ApprovalRecord>>,
}

impl ApprovalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new pending approval and returns it.
    pub fn request(
        &self,
        action: String,
        summary: String,
        risk: RiskLevel,
        artifacts: Vec<String>,
    ) -> ApprovalRecord {
        let record = ApprovalRecord {
            approval_id: Uuid::new_v4().to_string(),
            action,
            summary,
            risk,
            artifacts,
            status: ApprovalStatus::Pending,
            created_at: utc_timestamp(),
            decided_at: None,
        };
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.approval_id.clone(), record.clone());
        record
    }

    /// Returns the approval with `approval_id`.
    #[must_use]
    pub fn get(&self, approval_id: &str) -> Option<ApprovalRecord> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.get(approval_id).cloned()
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// `request_approval` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RequestApprovalArgs {
    /// Action awaiting approval.
    action: String,
    /// Human-readable summary.
    summary: String,
    /// Declared risk.
    risk: RiskLevel,
    /// Supporting artifacts.
    #[serde(default)]
    artifacts: Vec<String>,
}

/// `check_approval` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CheckApprovalArgs {
    /// Approval identifier.
    approval_id: String,
}

/// Registers `request_approval` and `check_approval`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let store = services.approvals.clone();
    registry.register(
        ToolDefinition::new(
            "request_approval",
            "Request human approval for a risky action (deploy, spend, delete, credential change).",
            json!({
                "type": "object",
                "properties": {
                    "action": {"type": "string"},
                    "summary": {"type": "string"},
                    "risk": {"type": "string", "enum": ["low", "medium", "high"]},
                    "artifacts": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["action", "summary", "risk"]
            }),
        ),
        move |arguments: Value| {
            let args: RequestApprovalArgs = parse_args(arguments)?;
            let record = store.request(args.action, args.summary, args.risk, args.artifacts);
            Ok(json!({
                "ok": true,
                "approval_id": record.approval_id,
                "status": record.status,
            }))
        },
    );

    let store = services.approvals.clone();
    registry.register(
        ToolDefinition::new(
            "check_approval",
            "Check the status of a previously requested approval.",
            json!({
                "type": "object",
                "properties": {"approval_id": {"type": "string"}},
                "required": ["approval_id"]
            }),
        ),
        move |arguments: Value| {
            let args: CheckApprovalArgs = parse_args(arguments)?;
            let record = store
                .get(&args.approval_id)
                .ok_or_else(|| HandlerError::NotFound("unknown approval_id".to_string()))?;
            Ok(json!({"ok": true, "approval": record}))
        },
    );
}
