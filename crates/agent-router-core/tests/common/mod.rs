// agent-router-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared manifests and scripted contract sources.
// Purpose: Build isolated governance state for each test.
// Dependencies: agent-router-core
// ============================================================================

//! ## Overview
//! Fixtures construct fresh manifest stores and handshakes per test so no
//! state leaks between cases.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use agent_router_core::ContractHandshake;
use agent_router_core::ContractSource;
use agent_router_core::ContractSourceError;
use agent_router_core::FreezeManifestStore;
use agent_router_core::HandshakeConfig;
use agent_router_core::ManualClock;
use agent_router_core::RemoteContract;
use agent_router_core::RemoteContracts;

// ============================================================================
// SECTION: Manifests
// ============================================================================

/// Schema hash of contract `X` in [`single_contract_manifest`].
pub const X_SCHEMA_HASH: &str = "abc123";

/// Raw bytes of a frozen manifest with one locked contract `X` at 1.0.0.
#[must_use]
pub fn single_contract_bytes() -> Vec<u8> {
    br#"{
  "vertex": "TEST",
  "version": "1.0.0",
  "status": "frozen",
  "frozen_at": "2026-01-01",
  "contracts": [
    {"name": "X", "version": "1.0.0", "status": "locked", "schema_hash": "abc123"}
  ],
  "governance": {"change_request_types": ["feedback_item"], "rule": "no hot patches"}
}"#
    .to_vec()
}

/// Store built from [`single_contract_bytes`].
#[must_use]
pub fn single_contract_manifest() -> Arc<FreezeManifestStore> {
    Arc::new(FreezeManifestStore::from_bytes(&single_contract_bytes()).unwrap())
}

/// Remote reply that agrees with [`single_contract_manifest`].
#[must_use]
pub fn matching_remote(store: &FreezeManifestStore) -> RemoteContracts {
    RemoteContracts {
        contracts: vec![RemoteContract {
            name: "X".to_string(),
            version: Some("1.0.0".to_string()),
            schema_hash: Some(X_SCHEMA_HASH.to_string()),
        }],
        manifest_hash: Some(store.manifest_hash().to_string()),
    }
}

// ============================================================================
// SECTION: Contract Sources
// ============================================================================

/// Contract source that replays scripted replies and counts calls.
pub struct ScriptedSource {
    /// Replies returned in order; the last one repeats.
    replies: Mutex<VecDeque<Result<RemoteContracts, ContractSourceError>>>,
    /// Number of fetches performed.
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// Creates a source from scripted replies.
    #[must_use]
    pub fn new(replies: Vec<Result<RemoteContracts, ContractSourceError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Source that always fails with a transport error.
    #[must_use]
    pub fn unreachable() -> Arc<Self> {
        Self::new(vec![Err(ContractSourceError::Transport("connection refused".to_string()))])
    }

    /// Returns how many fetches happened.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ContractSource for ScriptedSource {
    fn endpoint(&self) -> String {
        "scripted".to_string()
    }

    fn fetch(&self) -> Result<RemoteContracts, ContractSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }
}

// ============================================================================
// SECTION: Handshakes
// ============================================================================

/// Default test policy: three attempts, 2s base backoff, one hour TTL.
#[must_use]
pub fn test_config() -> HandshakeConfig {
    HandshakeConfig {
        max_attempts: 3,
        backoff_base: Duration::from_secs(2),
        cache_ttl: Duration::from_secs(3600),
    }
}

/// Builds a handshake over a manual clock.
#[must_use]
pub fn handshake_with(
    store: Arc<FreezeManifestStore>,
    source: Option<Arc<ScriptedSource>>,
    clock: Arc<ManualClock>,
) -> ContractHandshake {
    let source = source.map(|s| s as Arc<dyn ContractSource>);
    ContractHandshake::new(store, source, test_config(), clock)
}
