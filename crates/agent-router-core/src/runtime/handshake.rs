// agent-router-core/src/runtime/handshake.rs
// ============================================================================
// Module: Agent Router Contract Handshake
// Description: Startup verification of remote contract versions.
// Purpose: Record a pass/fail verdict that gates frozen tool dispatch.
// Dependencies: serde, thiserror, time, tracing, crate::core
// ============================================================================

//! ## Overview
//! [`ContractHandshake::run`] fetches the platform's contract list through a
//! [`ContractSource`], retrying transport failures with doubling backoff, and
//! compares the reply against the local [`FreezeManifestStore`] exactly once.
//! A content mismatch is definitive and never retried. A reply that parses
//! as JSON but not as a contract list is also content, not transport.
//!
//! The verdict is three-valued: unattempted, passed, or failed. Only passed
//! counts as valid. Runs are serialized so concurrent rechecks cannot
//! interleave partial writes to the diagnostic record.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Clock;
use crate::core::ContractEntry;
use crate::core::FreezeManifestStore;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Failure recorded when no platform endpoint is configured.
pub const NOT_CONFIGURED_ERROR: &str =
    "PLATFORM_BASE_URL not configured; handshake skipped, frozen tools will be blocked";

/// Placeholder for values the platform omitted.
const MISSING: &str = "<missing>";

// ============================================================================
// SECTION: Remote Types
// ============================================================================

/// Contract entry as reported by the platform.
///
/// Scalar fields are read leniently: numbers and booleans keep their JSON
/// text so a mistyped version surfaces as a version mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContract {
    /// Contract name.
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    /// Contract version, if reported.
    #[serde(default, deserialize_with = "lenient_text")]
    pub version: Option<String>,
    /// Schema hash, if reported.
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_hash: Option<String>,
}

/// Platform reply to the contract info request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteContracts {
    /// Contracts known to the platform; `null` reads as none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contracts: Vec<RemoteContract>,
    /// Aggregate manifest hash, if the platform tracks one.
    #[serde(default, deserialize_with = "lenient_text")]
    pub manifest_hash: Option<String>,
}

/// Reads an optional JSON scalar as text. `null` is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}

/// Reads a contract name leniently; absent or `null` is empty.
fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

/// Reads an optional list; `null` is empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Failures while fetching remote contracts.
///
/// [`ContractSourceError::Shape`] is content and ends the run at once; every
/// other variant is transient and retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContractSourceError {
    /// Connection, DNS, TLS, or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("http status {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Status reason or body excerpt.
        message: String,
    },
    /// Response body is not JSON.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// Response body is JSON but not a contract list.
    #[error("unexpected contract payload: {0}")]
    Shape(String),
}

/// Source of the platform's contract view.
pub trait ContractSource: Send + Sync {
    /// Returns a human-readable endpoint description for logs.
    fn endpoint(&self) -> String;

    /// Fetches the platform's contract list.
    ///
    /// # Errors
    ///
    /// Returns [`ContractSourceError`] on transport or decoding failures.
    fn fetch(&self) -> Result<RemoteContracts, ContractSourceError>;
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Retry and caching policy for the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    /// Maximum fetch attempts (at least one is always made).
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles on each further failure.
    pub backoff_base: Duration,
    /// Age after which a verdict is considered stale.
    pub cache_ttl: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

// ============================================================================
// SECTION: Status
// ============================================================================

/// Diagnostic snapshot of the handshake state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeStatus {
    /// `None` before the first run, then the last verdict.
    pub passed: Option<bool>,
    /// Mismatch or transport errors from the last run.
    pub errors: Vec<String>,
    /// Single human-readable failure reason.
    pub reason: Option<String>,
    /// Remote endpoint description, if configured.
    pub endpoint: Option<String>,
    /// Local contract summary.
    pub local: Vec<ContractEntry>,
    /// Remote contract summary from the last successful fetch.
    pub remote: Vec<RemoteContract>,
    /// Local manifest hash.
    pub manifest_hash: String,
    /// RFC 3339 timestamp of the last run.
    pub checked_at: Option<String>,
    /// Whether the verdict is older than the cache TTL.
    pub stale: bool,
}

/// Mutable verdict written once per run.
#[derive(Debug, Default)]
struct HandshakeState {
    /// Three-valued verdict.
    passed: Option<bool>,
    /// Errors from the last run.
    errors: Vec<String>,
    /// Remote contracts from the last successful fetch.
    remote: Vec<RemoteContract>,
    /// Wall-clock timestamp of the last run.
    checked_at: Option<String>,
    /// Monotonic timestamp of the last run.
    checked_instant: Option<Instant>,
}

// ============================================================================
// SECTION: Handshake
// ============================================================================

/// Contract handshake state machine.
pub struct ContractHandshake {
    /// Local manifest.
    store: Arc<FreezeManifestStore>,
    /// Remote contract source, absent when unconfigured.
    source: Option<Arc<dyn ContractSource>>,
    /// Retry and cache policy.
    config: HandshakeConfig,
    /// Time source for backoff and staleness.
    clock: Arc<dyn Clock>,
    /// Serializes runs.
    run_lock: Mutex<()>,
    /// Last verdict.
    state: RwLock<HandshakeState>,
}

impl ContractHandshake {
    /// Creates an unattempted handshake.
    #[must_use]
    pub fn new(
        store: Arc<FreezeManifestStore>,
        source: Option<Arc<dyn ContractSource>>,
        config: HandshakeConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            source,
            config,
            clock,
            run_lock: Mutex::new(()),
            state: RwLock::new(HandshakeState::default()),
        }
    }

    /// Runs the handshake and records the verdict.
    pub fn run(&self) -> bool {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.run_locked()
    }

    /// Runs the handshake only when the cached verdict is stale.
    ///
    /// Returns the resulting validity. Concurrent callers wait for a single
    /// run instead of each re-running it.
    pub fn refresh_if_stale(&self) -> bool {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_stale() {
            self.run_locked()
        } else {
            self.is_valid()
        }
    }

    /// Returns true only when the last run passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.read_state().passed == Some(true)
    }

    /// Returns true when no run has happened or the last run exceeded the TTL.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        match self.read_state().checked_instant {
            None => true,
            Some(at) => self.clock.now().saturating_duration_since(at) > self.config.cache_ttl,
        }
    }

    /// Returns errors from the last run.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.read_state().errors.clone()
    }

    /// Returns a diagnostic snapshot.
    #[must_use]
    pub fn status(&self) -> HandshakeStatus {
        let stale = self.is_stale();
        let state = self.read_state();
        HandshakeStatus {
            passed: state.passed,
            errors: state.errors.clone(),
            reason: failure_reason(&state.errors),
            endpoint: self.source.as_ref().map(|source| source.endpoint()),
            local: self.store.manifest().contracts.clone(),
            remote: state.remote.clone(),
            manifest_hash: self.store.manifest_hash().to_string(),
            checked_at: state.checked_at.clone(),
            stale,
        }
    }

    /// Returns the handshake to the unattempted state.
    pub fn reset(&self) {
        let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = HandshakeState::default();
    }

    /// Executes one run. Caller holds `run_lock`.
    fn run_locked(&self) -> bool {
        let Some(source) = &self.source else {
            error!(reason = NOT_CONFIGURED_ERROR, "contract handshake failed");
            self.record(vec![NOT_CONFIGURED_ERROR.to_string()], Vec::new());
            return false;
        };
        info!(endpoint = %source.endpoint(), "starting contract handshake");

        let remote = match self.fetch_with_retry(source.as_ref()) {
            Ok(remote) => remote,
            Err(message) => {
                error!(reason = %message, "contract handshake failed");
                self.record(vec![message], Vec::new());
                return false;
            }
        };

        let errors = compare_contracts(&self.store, &remote);
        let passed = errors.is_empty();
        if passed {
            info!(contracts = remote.contracts.len(), "contract handshake passed");
        } else {
            for mismatch in &errors {
                error!(mismatch = %mismatch, "contract mismatch");
            }
            error!("contract handshake failed; frozen tools will refuse to dispatch");
        }
        self.record(errors, remote.contracts);
        passed
    }

    /// Fetches remote contracts, retrying transport failures with backoff.
    fn fetch_with_retry(&self, source: &dyn ContractSource) -> Result<RemoteContracts, String> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1 ..= max_attempts {
            match source.fetch() {
                Ok(remote) => return Ok(remote),
                Err(ContractSourceError::Shape(detail)) => {
                    error!(
                        attempt,
                        error = %detail,
                        "platform contract payload rejected; not retried"
                    );
                    return Err(format!(
                        "Platform returned an unexpected contract payload: {detail}"
                    ));
                }
                Err(err) => {
                    last_error = err.to_string();
                    if attempt < max_attempts {
                        let backoff = self.backoff_for(attempt);
                        warn!(
                            attempt,
                            max_attempts,
                            error = %err,
                            backoff_ms = backoff.as_millis(),
                            "contract handshake attempt failed; retrying"
                        );
                        self.clock.sleep(backoff);
                    } else {
                        error!(
                            attempt,
                            max_attempts,
                            error = %err,
                            "contract handshake attempt failed; no retries left"
                        );
                    }
                }
            }
        }
        Err(format!("Platform unreachable after {max_attempts} attempts: {last_error}"))
    }

    /// Backoff after the given failed attempt: `base * 2^(attempt - 1)`.
    fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.config.backoff_base.saturating_mul(factor)
    }

    /// Writes the verdict of a completed run.
    fn record(&self, errors: Vec<String>, remote: Vec<RemoteContract>) {
        let checked_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *state = HandshakeState {
            passed: Some(errors.is_empty()),
            errors,
            remote,
            checked_at,
            checked_instant: Some(self.clock.now()),
        };
    }

    /// Acquires the state for reading.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, HandshakeState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Compares a platform reply against the local manifest.
///
/// Every discrepancy is collected; an empty result means the contracts agree.
#[must_use]
pub fn compare_contracts(store: &FreezeManifestStore, remote: &RemoteContracts) -> Vec<String> {
    if remote.contracts.is_empty() {
        return vec!["Platform returned no contracts; cannot verify handshake".to_string()];
    }

    let local: BTreeMap<&str, &ContractEntry> =
        store.manifest().contracts.iter().map(|c| (c.name.as_str(), c)).collect();
    let mut errors = Vec::new();

    for entry in &remote.contracts {
        let name = if entry.name.is_empty() { "<unknown>" } else { entry.name.as_str() };
        let Some(local_entry) = local.get(name) else {
            errors.push(format!("Platform has contract '{name}' not present in local manifest"));
            continue;
        };
        if entry.version.as_deref() != Some(local_entry.version.as_str()) {
            errors.push(format!(
                "Contract '{name}' version mismatch: platform={} local={}",
                entry.version.as_deref().unwrap_or(MISSING),
                local_entry.version
            ));
        }
        if let Some(remote_hash) = entry.schema_hash.as_deref().filter(|hash| !hash.is_empty())
            && local_entry.schema_hash.as_deref() != Some(remote_hash)
        {
            errors.push(format!(
                "Contract '{name}' schema_hash mismatch: platform={remote_hash} local={}",
                local_entry.schema_hash.as_deref().unwrap_or(MISSING)
            ));
        }
    }

    let remote_names: BTreeSet<&str> = remote.contracts.iter().map(|c| c.name.as_str()).collect();
    for name in store.locked_contracts() {
        if !remote_names.contains(name.as_str()) {
            errors.push(format!("Local contract '{name}' not found on platform"));
        }
    }

    if let Some(remote_hash) = remote.manifest_hash.as_deref().filter(|hash| !hash.is_empty())
        && remote_hash != store.manifest_hash()
    {
        errors.push(format!(
            "Manifest hash mismatch: platform={remote_hash} local={}",
            store.manifest_hash()
        ));
    }

    errors
}

/// Joins errors into a single reason, or `None` when there are none.
fn failure_reason(errors: &[String]) -> Option<String> {
    if errors.is_empty() { None } else { Some(errors.join("; ")) }
}
