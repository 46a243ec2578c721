// agent-router-server/src/tools.rs
// ============================================================================
// Module: Tool Registry and Dispatcher
// Description: Named tool handlers behind a gated, audited dispatch pipeline.
// Purpose: Route every tool call through the same governance checks.
// Dependencies: agent-router-config, agent-router-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ToolRouter::dispatch`] runs a fixed pipeline: unknown-name check,
//! frozen-tool gate, workspace gate, handler invocation, error
//! classification, response stamping, audit. Business failures come back as
//! `{ok: false, ...}` envelopes. Only the two gate failures surface as
//! [`DispatchError`], which the transport turns into 503 and 422 responses.
//! One audit record is written per dispatch, whatever the outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use agent_router_config::RecheckPolicy;
use agent_router_core::ContractHandshake;
use agent_router_core::FreezeManifestStore;
use agent_router_core::SchemaIntegrity;
use agent_router_core::is_truthy;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::audit::AuditSink;
use crate::audit::ToolCallRecord;
use crate::errors::ErrorCode;
use crate::errors::HandlerError;
use crate::workspace::WorkspaceRegistry;

// ============================================================================
// SECTION: Definitions
// ============================================================================

/// Dispatch-relevant tool tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToolTags {
    /// Gated on a passing handshake while the vertex is frozen.
    pub frozen: bool,
    /// Accepts a `workspace` argument checked against the registry.
    pub workspace: bool,
}

/// Tool name, description, and argument schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Model-facing description.
    pub description: String,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
    /// Dispatch tags.
    #[serde(skip)]
    pub tags: ToolTags,
}

impl ToolDefinition {
    /// Creates an untagged definition.
    #[must_use]
    pub fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
            tags: ToolTags::default(),
        }
    }

    /// Marks the tool as frozen.
    #[must_use]
    pub const fn frozen(mut self) -> Self {
        self.tags.frozen = true;
        self
    }

    /// Marks the tool as workspace-scoped.
    #[must_use]
    pub const fn workspace(mut self) -> Self {
        self.tags.workspace = true;
        self
    }

    /// Renders the definition in function-calling form.
    #[must_use]
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Tool implementation.
pub trait ToolHandler: Send + Sync {
    /// Handles one call.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] on any failure; the dispatcher classifies it.
    fn call(&self, arguments: Value) -> Result<Value, HandlerError>;
}

impl<F> ToolHandler for F
where
    F: Fn(Value) -> Result<Value, HandlerError> + Send + Sync,
{
    fn call(&self, arguments: Value) -> Result<Value, HandlerError> {
        self(arguments)
    }
}

/// Registered definition plus handler.
#[derive(Clone)]
pub struct RegisteredTool {
    /// Definition and tags.
    pub definition: ToolDefinition,
    /// Implementation.
    pub handler: Arc<dyn ToolHandler>,
}

/// Tools keyed by name, listed in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    /// Tools in registration order.
    tools: Vec<RegisteredTool>,
    /// Name to position in `tools`.
    index: BTreeMap<String, usize>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. Registering an existing name replaces it in place.
    pub fn register<H>(&mut self, definition: ToolDefinition, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let tool = RegisteredTool {
            definition,
            handler: Arc::new(handler),
        };
        if let Some(&position) = self.index.get(&tool.definition.name) {
            self.tools[position] = tool;
        } else {
            self.index.insert(tool.definition.name.clone(), self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Returns the tool registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.index.get(name).and_then(|&position| self.tools.get(position))
    }

    /// Returns every definition in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|tool| &tool.definition).collect()
    }

    /// Returns the names of frozen tools.
    #[must_use]
    pub fn frozen_tools(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|tool| tool.definition.tags.frozen)
            .map(|tool| tool.definition.name.as_str())
            .collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ============================================================================
// SECTION: Dispatch Errors
// ============================================================================

/// Gate failures that escape dispatch as transport-level errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    /// Frozen tool called while the handshake has not passed.
    #[error("contract mismatch for frozen tool '{tool}': {reason}")]
    ContractMismatch {
        /// Tool name.
        tool: String,
        /// Human-readable reason.
        reason: String,
        /// Errors from the last handshake run.
        handshake_errors: Vec<String>,
    },
    /// Workspace argument names no registered workspace.
    #[error("{reason}")]
    WorkspaceNotFound {
        /// Tool name.
        tool: String,
        /// Arguments as submitted.
        args: Value,
        /// Human-readable reason.
        reason: String,
        /// Registered workspace ids.
        available_workspaces: Vec<String>,
    },
}

impl DispatchError {
    /// Returns the audit code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ContractMismatch {
                ..
            } => ErrorCode::ContractMismatch,
            Self::WorkspaceNotFound {
                ..
            } => ErrorCode::WorkspaceNotFound,
        }
    }

    /// Returns the `detail` body the transport sends.
    #[must_use]
    pub fn detail(&self) -> Value {
        match self {
            Self::ContractMismatch {
                tool,
                reason,
                handshake_errors,
            } => json!({
                "error": ErrorCode::ContractMismatch.as_str(),
                "tool": tool,
                "reason": reason,
                "handshake_errors": handshake_errors,
            }),
            Self::WorkspaceNotFound {
                tool,
                args,
                reason,
                available_workspaces,
            } => json!({
                "tool": tool,
                "args": args,
                "reason": reason,
                "availableWorkspaces": available_workspaces,
            }),
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Inputs for building a [`ToolRouter`].
pub struct ToolRouterConfig {
    /// Registered tools.
    pub registry: ToolRegistry,
    /// Freeze manifest.
    pub manifest: Arc<FreezeManifestStore>,
    /// Contract handshake.
    pub handshake: Arc<ContractHandshake>,
    /// Workspace registry.
    pub workspaces: Arc<WorkspaceRegistry>,
    /// Audit destination.
    pub audit: Arc<dyn AuditSink>,
    /// Frozen schema baselines.
    pub schemas: Arc<SchemaIntegrity>,
    /// When to re-run a stale handshake.
    pub recheck: RecheckPolicy,
}

/// Gated, audited tool dispatcher.
#[derive(Clone)]
pub struct ToolRouter {
    /// Registered tools.
    registry: Arc<ToolRegistry>,
    /// Freeze manifest.
    manifest: Arc<FreezeManifestStore>,
    /// Contract handshake.
    handshake: Arc<ContractHandshake>,
    /// Workspace registry.
    workspaces: Arc<WorkspaceRegistry>,
    /// Audit destination.
    audit: Arc<dyn AuditSink>,
    /// Frozen schema baselines.
    schemas: Arc<SchemaIntegrity>,
    /// When to re-run a stale handshake.
    recheck: RecheckPolicy,
}

impl ToolRouter {
    /// Creates a router.
    #[must_use]
    pub fn new(config: ToolRouterConfig) -> Self {
        Self {
            registry: Arc::new(config.registry),
            manifest: config.manifest,
            handshake: config.handshake,
            workspaces: config.workspaces,
            audit: config.audit,
            schemas: config.schemas,
            recheck: config.recheck,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the handshake.
    #[must_use]
    pub const fn handshake(&self) -> &Arc<ContractHandshake> {
        &self.handshake
    }

    /// Returns the frozen schema baselines.
    #[must_use]
    pub const fn schema_integrity(&self) -> &Arc<SchemaIntegrity> {
        &self.schemas
    }

    /// Returns tool definitions in function-calling form.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Value> {
        self.registry.definitions().into_iter().map(ToolDefinition::to_function_schema).collect()
    }

    /// Dispatches one tool call and writes one audit record.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] only for the frozen-tool and workspace gates.
    pub fn dispatch(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let started = Instant::now();
        let outcome = self.dispatch_inner(name, arguments);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let record = match &outcome {
            Ok(response) => {
                let ok = response.get("ok").is_none_or(is_truthy);
                let code = response.get("error_code").and_then(Value::as_str);
                ToolCallRecord::new(name, ok, code, duration_ms)
            }
            Err(err) => ToolCallRecord::new(name, false, Some(err.code().as_str()), duration_ms),
        };
        self.audit.record_tool_call(&record);
        outcome
    }

    /// Runs the gates and the handler.
    fn dispatch_inner(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let Some(tool) = self.registry.get(name) else {
            return Ok(json!({
                "ok": false,
                "error_code": ErrorCode::UnknownTool.as_str(),
                "message": format!("Unknown tool: {name}"),
                "tool": name,
            }));
        };
        if tool.definition.tags.frozen {
            self.check_frozen_gate(name)?;
        }
        if tool.definition.tags.workspace {
            self.check_workspace_gate(name, &arguments)?;
        }
        match tool.handler.call(arguments) {
            Ok(response) => Ok(self.manifest.stamp_response(response)),
            Err(err) => {
                warn!(tool = name, error_code = err.code().as_str(), error = %err, "tool failed");
                Ok(json!({
                    "ok": false,
                    "error_code": err.code().as_str(),
                    "message": err.to_string(),
                    "tool": name,
                    "vertex": self.manifest.vertex_stamp_value(),
                }))
            }
        }
    }

    /// Blocks frozen tools unless the handshake has passed.
    fn check_frozen_gate(&self, name: &str) -> Result<(), DispatchError> {
        if !self.manifest.is_frozen() {
            return Ok(());
        }
        if self.recheck == RecheckPolicy::OnFrozenCall {
            self.handshake.refresh_if_stale();
        }
        if self.handshake.is_valid() {
            return Ok(());
        }
        let status = self.handshake.status();
        warn!(tool = name, "frozen tool blocked: contract handshake has not passed");
        Err(DispatchError::ContractMismatch {
            tool: name.to_string(),
            reason: status
                .reason
                .unwrap_or_else(|| "Contract handshake has not been run".to_string()),
            handshake_errors: status.errors,
        })
    }

    /// Rejects a supplied workspace that is not registered.
    fn check_workspace_gate(&self, name: &str, arguments: &Value) -> Result<(), DispatchError> {
        let Some(workspace) = arguments.get("workspace").and_then(Value::as_str) else {
            return Ok(());
        };
        if self.workspaces.contains(workspace) {
            return Ok(());
        }
        Err(DispatchError::WorkspaceNotFound {
            tool: name.to_string(),
            args: arguments.clone(),
            reason: format!("Workspace '{workspace}' not found"),
            available_workspaces: self.workspaces.ids(),
        })
    }
}
