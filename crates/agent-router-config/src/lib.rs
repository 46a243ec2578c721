// agent-router-config/src/lib.rs
// ============================================================================
// Module: Agent Router Config Library
// Description: Canonical router configuration model and validation.
// Purpose: Single source of truth for router settings and their defaults.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `agent-router-config` defines the router configuration model. Settings
//! come from an optional TOML file, are overridden by environment variables,
//! and are validated fail-closed before the router starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
