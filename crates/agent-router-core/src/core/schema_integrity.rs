// agent-router-core/src/core/schema_integrity.rs
// ============================================================================
// Module: Agent Router Schema Integrity
// Description: Known-good SHA-256 digests for frozen contract schema files.
// Purpose: Detect on-disk drift of schemas locked by the freeze manifest.
// Dependencies: serde, sha2, tracing
// ============================================================================

//! ## Overview
//! Each frozen contract schema is registered once with the file it lives in
//! and the digest it had when the freeze was declared. Verification re-reads
//! every registered file and reports the contracts whose bytes no longer
//! hash to the registered value. A file that cannot be read is a violation.
//!
//! Registering a contract twice replaces its baseline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::hashing::sha256_hex;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Actual-hash placeholder for a schema file that could not be read.
pub const UNREADABLE_SCHEMA: &str = "unreadable";

/// Registered baseline for one contract.
#[derive(Debug, Clone)]
struct FrozenSchema {
    /// Schema file on disk.
    path: PathBuf,
    /// Digest recorded at freeze time.
    expected: String,
}

/// One contract whose schema no longer matches its baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaViolation {
    /// Contract name.
    pub contract: String,
    /// Registered digest.
    pub expected: String,
    /// Current digest, or [`UNREADABLE_SCHEMA`].
    pub actual: String,
}

/// Errors raised while registering a schema baseline.
#[derive(Debug, Error)]
pub enum SchemaIntegrityError {
    /// Schema file could not be read.
    #[error("schema io error for {contract}: {detail}")]
    Io {
        /// Contract being registered.
        contract: String,
        /// Underlying error text.
        detail: String,
    },
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Registry of frozen schema digests.
#[derive(Debug, Default)]
pub struct SchemaIntegrity {
    /// Baselines keyed by contract name.
    schemas: Mutex<BTreeMap<String, FrozenSchema>>,
}

impl SchemaIntegrity {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `schema_hash` as the known-good digest of `path` for `contract`.
    pub fn register_frozen_schema_hash(
        &self,
        contract: &str,
        path: impl Into<PathBuf>,
        schema_hash: &str,
    ) {
        self.lock().insert(
            contract.to_string(),
            FrozenSchema {
                path: path.into(),
                expected: schema_hash.to_ascii_lowercase(),
            },
        );
    }

    /// Hashes `path` now and records the digest as the baseline for `contract`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaIntegrityError::Io`] when the file cannot be read.
    pub fn register_current(
        &self,
        contract: &str,
        path: &Path,
    ) -> Result<String, SchemaIntegrityError> {
        let hash = hash_file(path).map_err(|err| SchemaIntegrityError::Io {
            contract: contract.to_string(),
            detail: err.to_string(),
        })?;
        self.register_frozen_schema_hash(contract, path, &hash);
        info!(contract, schema_hash = %hash, "registered frozen schema hash");
        Ok(hash)
    }

    /// Names of the registered contracts, sorted.
    #[must_use]
    pub fn registered(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Re-hashes every registered schema and returns the drifted ones.
    ///
    /// An empty result means every frozen schema is intact.
    #[must_use]
    pub fn verify_schema_integrity(&self) -> Vec<SchemaViolation> {
        let schemas = self.lock().clone();
        let mut violations = Vec::new();
        for (contract, schema) in schemas {
            let actual = match hash_file(&schema.path) {
                Ok(hash) => hash,
                Err(err) => {
                    warn!(contract = %contract, error = %err, "frozen schema unreadable");
                    UNREADABLE_SCHEMA.to_string()
                }
            };
            if actual != schema.expected {
                warn!(contract = %contract, expected = %schema.expected, actual = %actual, "frozen schema drifted");
                violations.push(SchemaViolation {
                    contract,
                    expected: schema.expected,
                    actual,
                });
            }
        }
        violations
    }

    /// Acquires the baseline map.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, FrozenSchema>> {
        self.schemas.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// SHA-256 of the exact file bytes.
fn hash_file(path: &Path) -> std::io::Result<String> {
    fs::read(path).map(|bytes| sha256_hex(&bytes))
}
