// agent-router-server/src/lib.rs
// ============================================================================
// Module: Agent Router Server
// Description: Tool dispatch pipeline, built-in handlers, and HTTP transport.
// Purpose: Serve agent tool calls behind contract governance gates.
// Dependencies: agent-router-config, agent-router-core, agent-router-providers, axum
// ============================================================================

//! ## Overview
//! Every tool call flows through [`ToolRouter::dispatch`]: unknown-name
//! check, frozen-tool gate, workspace gate, handler invocation, error
//! classification, vertex stamping, and audit. [`RouterServer`] wires the
//! dispatcher from configuration and exposes it over HTTP.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod errors;
pub mod handlers;
pub mod server;
pub mod tools;
pub mod workspace;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::EstimateRunRecord;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::ToolCallRecord;
pub use errors::ErrorCode;
pub use errors::HandlerError;
pub use handlers::ToolServices;
pub use handlers::ToolSettings;
pub use handlers::builtin_registry;
pub use server::AppState;
pub use server::RouterServer;
pub use server::ServerError;
pub use server::build_tool_router;
pub use server::handle_tool_request;
pub use server::register_frozen_schemas;
pub use tools::DispatchError;
pub use tools::ToolDefinition;
pub use tools::ToolRegistry;
pub use tools::ToolRouter;
pub use tools::ToolRouterConfig;
pub use workspace::WorkspaceRegistry;
