// agent-router-core/src/core/manifest.rs
// ============================================================================
// Module: Agent Router Freeze Manifest
// Description: Immutable freeze manifest store and governance projections.
// Purpose: Load the governance document once and answer frozen/locked queries.
// Dependencies: serde, serde_json, tracing, crate::core::hashing
// ============================================================================

//! ## Overview
//! The freeze manifest declares which contracts, intelligence components, and
//! output formats are locked for a vertex. [`FreezeManifestStore`] parses it
//! eagerly, hashes the exact source bytes, and precomputes the
//! [`VertexStamp`]. Nothing is mutated afterwards, so concurrent readers need
//! no locking and the hash stays stable even if the file changes on disk.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::core::hashing::sha256_hex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest status that marks a vertex as frozen.
pub const STATUS_FROZEN: &str = "frozen";

/// Contract status that marks a contract as locked.
pub const STATUS_LOCKED: &str = "locked";

/// Manifest bundled with the router for the IBEW low-voltage vertex.
const BUNDLED_MANIFEST: &[u8] = include_bytes!("../../manifests/IBEW_LV_V1.freeze.json");

/// Number of hash characters included in the load log line.
const HASH_LOG_PREFIX: usize = 12;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parsed freeze manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreezeManifest {
    /// Domain vertex name.
    pub vertex: String,
    /// Semantic version of the frozen vertex.
    pub version: String,
    /// Vertex status (`frozen` or anything else).
    pub status: String,
    /// Date the freeze was declared.
    pub frozen_at: String,
    /// Output contracts governed by the freeze.
    #[serde(default)]
    pub contracts: Vec<ContractEntry>,
    /// Locked intelligence components.
    #[serde(default)]
    pub intelligence: Option<IntelligenceSection>,
    /// Locked output formats.
    #[serde(default)]
    pub outputs: Option<OutputsSection>,
    /// Actions prohibited until the next major version.
    #[serde(default)]
    pub prohibited_until_v2: Vec<String>,
    /// Actions still allowed while frozen.
    #[serde(default)]
    pub allowed_after_freeze: Vec<String>,
    /// Change governance rules.
    #[serde(default)]
    pub governance: GovernanceSection,
}

/// Contract entry inside the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    /// Contract name.
    pub name: String,
    /// Contract version string.
    pub version: String,
    /// Contract status (`locked` when frozen).
    pub status: String,
    /// Optional SHA-256 of the contract schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hash: Option<String>,
}

/// Named manifest component with free-form attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestComponent {
    /// Component name.
    pub name: String,
    /// Component-specific attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Intelligence section of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntelligenceSection {
    /// Section status.
    pub status: String,
    /// Locked components.
    #[serde(default)]
    pub components: Vec<ManifestComponent>,
}

/// Outputs section of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputsSection {
    /// Section status.
    pub status: String,
    /// Locked output formats.
    #[serde(default)]
    pub formats: Vec<ManifestComponent>,
}

/// Change governance rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceSection {
    /// Accepted change request types.
    #[serde(default)]
    pub change_request_types: BTreeSet<String>,
    /// Human-readable governance rule.
    #[serde(default)]
    pub rule: String,
}

/// Deterministic metadata block attached to successful tool responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexStamp {
    /// Domain vertex name.
    pub vertex: String,
    /// Vertex version.
    pub version: String,
    /// Vertex status.
    pub status: String,
    /// Freeze date.
    pub frozen_at: String,
    /// Contract names in manifest order.
    pub contracts: Vec<String>,
    /// SHA-256 of the manifest source bytes.
    pub manifest_hash: String,
}

/// Outcome of validating a change request type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeClassification {
    /// Whether the change type is accepted under governance.
    pub valid: bool,
    /// Change type that was classified.
    pub change_type: String,
    /// User-facing explanation.
    pub message: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading a freeze manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Manifest file could not be read.
    #[error("manifest io error: {0}")]
    Io(String),
    /// Manifest bytes are not a valid manifest document.
    #[error("manifest parse error: {0}")]
    Parse(String),
    /// Manifest violates a governance invariant.
    #[error("invalid manifest: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Immutable freeze manifest plus its derived projections.
#[derive(Debug, Clone)]
pub struct FreezeManifestStore {
    /// Parsed manifest.
    manifest: FreezeManifest,
    /// SHA-256 of the source bytes.
    manifest_hash: String,
    /// Precomputed vertex stamp.
    stamp: VertexStamp,
    /// Precomputed JSON form of the stamp.
    stamp_value: Value,
}

impl FreezeManifestStore {
    /// Loads a manifest from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn open(path: &Path) -> Result<Self, ManifestError> {
        let bytes = std::fs::read(path)
            .map_err(|err| ManifestError::Io(format!("{}: {err}", path.display())))?;
        Self::from_bytes(&bytes)
    }

    /// Loads the manifest bundled with the router.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the bundled manifest is invalid.
    pub fn bundled() -> Result<Self, ManifestError> {
        Self::from_bytes(BUNDLED_MANIFEST)
    }

    /// Parses and validates manifest bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] for malformed JSON and
    /// [`ManifestError::Invalid`] when a frozen manifest has unlocked contracts.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: FreezeManifest =
            serde_json::from_slice(bytes).map_err(|err| ManifestError::Parse(err.to_string()))?;
        validate_manifest(&manifest)?;
        let manifest_hash = sha256_hex(bytes);
        let stamp = VertexStamp {
            vertex: manifest.vertex.clone(),
            version: manifest.version.clone(),
            status: manifest.status.clone(),
            frozen_at: manifest.frozen_at.clone(),
            contracts: manifest.contracts.iter().map(|c| c.name.clone()).collect(),
            manifest_hash: manifest_hash.clone(),
        };
        let stamp_value =
            serde_json::to_value(&stamp).map_err(|err| ManifestError::Invalid(err.to_string()))?;
        info!(
            vertex = %manifest.vertex,
            version = %manifest.version,
            status = %manifest.status,
            hash = %manifest_hash.get(..HASH_LOG_PREFIX).unwrap_or(&manifest_hash),
            "loaded freeze manifest"
        );
        Ok(Self {
            manifest,
            manifest_hash,
            stamp,
            stamp_value,
        })
    }

    /// Returns the parsed manifest.
    #[must_use]
    pub const fn manifest(&self) -> &FreezeManifest {
        &self.manifest
    }

    /// Returns the SHA-256 hex digest of the manifest source bytes.
    #[must_use]
    pub fn manifest_hash(&self) -> &str {
        &self.manifest_hash
    }

    /// Returns true when the vertex status is `frozen`.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.manifest.status == STATUS_FROZEN
    }

    /// Returns true when a contract with `name` exists and is locked.
    #[must_use]
    pub fn is_contract_locked(&self, name: &str) -> bool {
        self.manifest.contracts.iter().any(|c| c.name == name && c.status == STATUS_LOCKED)
    }

    /// Returns the names of locked contracts in manifest order.
    #[must_use]
    pub fn locked_contracts(&self) -> Vec<String> {
        self.manifest
            .contracts
            .iter()
            .filter(|c| c.status == STATUS_LOCKED)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Returns actions prohibited until the next major version.
    #[must_use]
    pub fn prohibited_actions(&self) -> &[String] {
        &self.manifest.prohibited_until_v2
    }

    /// Returns actions still permitted under the freeze.
    #[must_use]
    pub fn allowed_actions(&self) -> &[String] {
        &self.manifest.allowed_after_freeze
    }

    /// Returns the vertex stamp.
    #[must_use]
    pub const fn vertex_stamp(&self) -> &VertexStamp {
        &self.stamp
    }

    /// Returns the vertex stamp as a JSON value.
    #[must_use]
    pub fn vertex_stamp_value(&self) -> Value {
        self.stamp_value.clone()
    }

    /// Validates a change request type against the governance section.
    #[must_use]
    pub fn classify_change_request(&self, change_type: &str) -> ChangeClassification {
        let types = &self.manifest.governance.change_request_types;
        if types.contains(change_type) {
            return ChangeClassification {
                valid: true,
                change_type: change_type.to_string(),
                message: format!(
                    "Change request type '{change_type}' is valid under freeze governance."
                ),
            };
        }
        let allowed = types.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        ChangeClassification {
            valid: false,
            change_type: change_type.to_string(),
            message: format!(
                "Change request type '{change_type}' is not valid. Must be one of: [{allowed}]. \
                 Hot patches are not allowed under freeze governance."
            ),
        }
    }

    /// Injects the vertex stamp into a successful response.
    ///
    /// Non-object values, responses whose `ok` is absent or falsy, and
    /// responses that already carry a `vertex` key are returned unchanged.
    #[must_use]
    pub fn stamp_response(&self, response: Value) -> Value {
        let Value::Object(mut map) = response else {
            return response;
        };
        if !map.get("ok").is_some_and(is_truthy) || map.contains_key("vertex") {
            return Value::Object(map);
        }
        map.insert("vertex".to_string(), self.vertex_stamp_value());
        Value::Object(map)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects a frozen manifest whose contracts are not all locked.
fn validate_manifest(manifest: &FreezeManifest) -> Result<(), ManifestError> {
    if manifest.vertex.trim().is_empty() {
        return Err(ManifestError::Invalid("vertex must be non-empty".to_string()));
    }
    if manifest.status != STATUS_FROZEN {
        return Ok(());
    }
    let unlocked: Vec<&str> = manifest
        .contracts
        .iter()
        .filter(|c| c.status != STATUS_LOCKED)
        .map(|c| c.name.as_str())
        .collect();
    if unlocked.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid(format!(
            "frozen vertex has unlocked contracts: {}",
            unlocked.join(", ")
        )))
    }
}

/// Returns the JSON truthiness of a value.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
