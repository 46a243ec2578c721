// agent-router-server/src/handlers/governance.rs
// ============================================================================
// Module: Governance Tools
// Description: Change-request classification against the freeze manifest.
// Purpose: Tell agents which change types the frozen vertex accepts.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Classification is a lookup in the manifest's governance section. An
//! unknown type is reported with `valid: false`, not as an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Tools
// ============================================================================

/// `governance_classify_change` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassifyArgs {
    /// Requested change type.
    change_type: String,
}

/// Registers `governance_classify_change`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let manifest = services.manifest.clone();
    registry.register(
        ToolDefinition::new(
            "governance_classify_change",
            "Check whether a change request type is permitted under freeze governance.",
            json!({
                "type": "object",
                "properties": {"change_type": {"type": "string"}},
                "required": ["change_type"]
            }),
        ),
        move |arguments: Value| {
            let args: ClassifyArgs = parse_args(arguments)?;
            let verdict = manifest.classify_change_request(&args.change_type);
            Ok(json!({
                "ok": true,
                "valid": verdict.valid,
                "change_type": verdict.change_type,
                "message": verdict.message,
            }))
        },
    );
}
