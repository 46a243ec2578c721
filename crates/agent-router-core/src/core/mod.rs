// agent-router-core/src/core/mod.rs
// ============================================================================
// Module: Agent Router Core Types
// Description: Clock, hashing, freeze manifest, and schema integrity primitives.
// Purpose: Provide the immutable governance state shared by all tool calls.
// Dependencies: serde, sha2, time
// ============================================================================

//! ## Overview
//! Core types describe the freeze manifest and the deterministic projections
//! derived from it. Everything here is read-only after construction.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod clock;
pub mod hashing;
pub mod manifest;
pub mod schema_integrity;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use hashing::hex_encode;
pub use hashing::sha256_hex;
pub use manifest::ChangeClassification;
pub use manifest::ContractEntry;
pub use manifest::FreezeManifest;
pub use manifest::FreezeManifestStore;
pub use manifest::GovernanceSection;
pub use manifest::IntelligenceSection;
pub use manifest::ManifestComponent;
pub use manifest::ManifestError;
pub use manifest::OutputsSection;
pub use manifest::VertexStamp;
pub use manifest::is_truthy;
pub use schema_integrity::SchemaIntegrity;
pub use schema_integrity::SchemaIntegrityError;
pub use schema_integrity::SchemaViolation;
pub use schema_integrity::UNREADABLE_SCHEMA;
