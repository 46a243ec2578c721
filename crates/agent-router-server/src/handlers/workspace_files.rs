// agent-router-server/src/handlers/workspace_files.rs
// ============================================================================
// Module: Workspace File Tools
// Description: List, read, and write files inside a workspace.
// Purpose: Give agents confined filesystem access to their project folders.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every path is resolved through [`WorkspaceRegistry::resolve`], which
//! rejects traversal outside the workspace root.
//!
//! [`WorkspaceRegistry::resolve`]: crate::workspace::WorkspaceRegistry::resolve

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default read limit in bytes.
const DEFAULT_MAX_READ_BYTES: u64 = 200_000;

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// `workspace_list` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    /// Workspace id.
    workspace: String,
    /// Directory relative to the workspace.
    #[serde(default = "default_list_path")]
    path: String,
}

/// `workspace_read` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReadArgs {
    /// Workspace id.
    workspace: String,
    /// File relative to the workspace.
    path: String,
    /// Maximum file size accepted.
    #[serde(default = "default_max_bytes")]
    max_bytes: u64,
}

/// `workspace_write` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WriteArgs {
    /// Workspace id.
    workspace: String,
    /// File relative to the workspace.
    path: String,
    /// UTF-8 content.
    content: String,
    /// Create missing parent directories.
    #[serde(default = "default_true")]
    mkdirs: bool,
}

/// Default listing directory.
fn default_list_path() -> String {
    ".".to_string()
}

/// Default read limit.
const fn default_max_bytes() -> u64 {
    DEFAULT_MAX_READ_BYTES
}

/// Serde default of `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Registers the workspace file tools.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let workspaces = services.workspaces.clone();
    registry.register(
        ToolDefinition::new(
            "workspace_list_roots",
            "List the project workspaces available under WORKSPACE_ROOT.",
            json!({"type": "object", "properties": {}}),
        ),
        move |_arguments: Value| {
            let entries = workspaces.list();
            Ok(json!({"ok": true, "count": entries.len(), "workspaces": entries}))
        },
    );

    let workspaces = services.workspaces.clone();
    registry.register(
        ToolDefinition::new(
            "workspace_list",
            "List files and folders inside a workspace directory.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string"},
                    "path": {"type": "string", "default": "."}
                },
                "required": ["workspace"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: ListArgs = parse_args(arguments)?;
            let dir = workspaces.resolve(&args.workspace, &args.path)?;
            let mut items = Vec::new();
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let metadata = entry.metadata()?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if metadata.is_dir() {
                    items.push(json!({"name": name, "is_dir": true}));
                } else {
                    items.push(json!({"name": name, "is_dir": false, "size": metadata.len()}));
                }
            }
            items.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
            Ok(json!({"ok": true, "path": args.path, "items": items}))
        },
    );

    let workspaces = services.workspaces.clone();
    registry.register(
        ToolDefinition::new(
            "workspace_read",
            "Read a UTF-8 text file from a workspace.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string"},
                    "path": {"type": "string"},
                    "max_bytes": {"type": "integer", "minimum": 1, "default": DEFAULT_MAX_READ_BYTES}
                },
                "required": ["workspace", "path"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: ReadArgs = parse_args(arguments)?;
            let path = workspaces.resolve(&args.workspace, &args.path)?;
            let metadata = fs::metadata(&path)?;
            if !metadata.is_file() {
                return Err(HandlerError::InvalidInput(format!("Not a file: '{}'", args.path)));
            }
            if metadata.len() > args.max_bytes {
                return Err(HandlerError::InvalidInput(format!(
                    "File too large: {} bytes (max {})",
                    metadata.len(),
                    args.max_bytes
                )));
            }
            let mut bytes = Vec::new();
            fs::File::open(&path)?.read_to_end(&mut bytes)?;
            let content = String::from_utf8_lossy(&bytes).into_owned();
            Ok(json!({"ok": true, "path": args.path, "content": content}))
        },
    );

    let workspaces = services.workspaces.clone();
    registry.register(
        ToolDefinition::new(
            "workspace_write",
            "Write a UTF-8 text file into a workspace, replacing any existing content.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string"},
                    "path": {"type": "string"},
                    "content": {"type": "string"},
                    "mkdirs": {"type": "boolean", "default": true}
                },
                "required": ["workspace", "path", "content"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: WriteArgs = parse_args(arguments)?;
            let path = workspaces.resolve(&args.workspace, &args.path)?;
            if args.mkdirs
                && let Some(parent) = path.parent()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, args.content.as_bytes())?;
            Ok(json!({"ok": true, "path": args.path, "bytes": args.content.len()}))
        },
    );
}
