// agent-router-server/src/handlers/mod.rs
// ============================================================================
// Module: Built-in Tool Handlers
// Description: Registration of every built-in tool and its shared services.
// Purpose: Assemble the default tool registry served by the router.
// Dependencies: agent-router-config, agent-router-core, agent-router-providers
// ============================================================================

//! ## Overview
//! Handlers are thin adapters over external collaborators: containers, the
//! filesystem, vendor sites, GitHub. Each submodule registers its tools into
//! a [`ToolRegistry`] with an argument schema and dispatch tags. Shared
//! services travel in [`ToolServices`] so tests can swap in fakes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod approvals;
pub mod blueprint;
pub mod browser;
pub mod estimate;
pub mod governance;
pub mod repo;
pub mod sandbox;
pub mod vendor;
pub mod workspace_files;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use agent_router_config::GithubConfig;
use agent_router_core::FreezeManifestStore;
use agent_router_providers::VendorPricing;

use crate::audit::AuditSink;
use crate::errors::HandlerError;
use crate::tools::ToolRegistry;
use crate::workspace::WorkspaceRegistry;

pub use approvals::ApprovalStore;
pub use sandbox::CommandOutput;
pub use sandbox::CommandRunner;
pub use sandbox::ProcessRunner;

// ============================================================================
// SECTION: Services
// ============================================================================

/// Static handler settings.
#[derive(Debug, Clone)]
pub struct ToolSettings {
    /// Container running sandbox commands.
    pub sandbox_container: String,
    /// Container running browser scripts.
    pub browser_container: String,
    /// Default sandbox command timeout.
    pub sandbox_timeout: Duration,
    /// GitHub settings for pull requests.
    pub github: GithubConfig,
    /// Active detection model id.
    pub active_model: String,
}

/// Collaborators shared by the built-in handlers.
#[derive(Clone)]
pub struct ToolServices {
    /// Workspace registry.
    pub workspaces: Arc<WorkspaceRegistry>,
    /// Process runner for container commands.
    pub runner: Arc<dyn CommandRunner>,
    /// Vendor pricing service.
    pub pricing: Arc<VendorPricing>,
    /// Freeze manifest.
    pub manifest: Arc<FreezeManifestStore>,
    /// Audit destination for estimate runs.
    pub audit: Arc<dyn AuditSink>,
    /// Approval records.
    pub approvals: Arc<ApprovalStore>,
    /// Static settings.
    pub settings: ToolSettings,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Builds the registry of built-in tools.
///
/// # Errors
///
/// Returns [`HandlerError::Internal`] when a handler's HTTP client cannot be built.
pub fn builtin_registry(services: &ToolServices) -> Result<ToolRegistry, HandlerError> {
    let mut registry = ToolRegistry::new();
    approvals::register(&mut registry, services);
    sandbox::register(&mut registry, services);
    workspace_files::register(&mut registry, services);
    repo::register(&mut registry, services)?;
    browser::register(&mut registry, services);
    vendor::register(&mut registry, services);
    blueprint::register(&mut registry, services);
    estimate::register(&mut registry, services);
    governance::register(&mut registry, services);
    Ok(registry)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns at most the last `limit` characters of `text`.
#[must_use]
pub fn tail_chars(text: &str, limit: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(limit)).collect()
}
