// agent-router-server/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scratch workspaces, scripted handshakes, and fake runners.
// Purpose: Build isolated dispatch pipelines for each test.
// Dependencies: agent-router-core, agent-router-providers, agent-router-server, tempfile
// ============================================================================

//! ## Overview
//! [`Fixture`] owns a temporary workspace root with two workspaces, a
//! temporary audit directory, a manual clock, and a scripted contract
//! source. Routers built from it share those collaborators so tests can
//! flip the handshake and inspect audit lines.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use agent_router_config::GithubConfig;
use agent_router_config::RecheckPolicy;
use agent_router_core::CircuitBreakerConfig;
use agent_router_core::ContractHandshake;
use agent_router_core::ContractSource;
use agent_router_core::ContractSourceError;
use agent_router_core::FreezeManifestStore;
use agent_router_core::HandshakeConfig;
use agent_router_core::ManualClock;
use agent_router_core::RemoteContract;
use agent_router_core::RemoteContracts;
use agent_router_core::SchemaIntegrity;
use agent_router_core::VendorCircuitBreaker;
use agent_router_core::VendorRateLimiter;
use agent_router_providers::VendorPricing;
use agent_router_providers::VendorPricingConfig;
use agent_router_providers::default_adapters;
use agent_router_server::FileAuditSink;
use agent_router_server::HandlerError;
use agent_router_server::ToolDefinition;
use agent_router_server::ToolRegistry;
use agent_router_server::ToolRouter;
use agent_router_server::ToolRouterConfig;
use agent_router_server::ToolServices;
use agent_router_server::ToolSettings;
use agent_router_server::WorkspaceRegistry;
use agent_router_server::audit::AUDIT_FILE_NAME;
use agent_router_server::handlers::ApprovalStore;
use agent_router_server::handlers::CommandOutput;
use agent_router_server::handlers::CommandRunner;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Manifests
// ============================================================================

/// Frozen manifest with one locked contract `X` at 1.0.0.
pub const FROZEN_MANIFEST: &str = r#"{
  "vertex": "TEST",
  "version": "1.0.0",
  "status": "frozen",
  "frozen_at": "2026-01-01",
  "contracts": [
    {"name": "X", "version": "1.0.0", "status": "locked", "schema_hash": "abc123"}
  ],
  "governance": {"change_request_types": ["feedback_item", "new_vertex"], "rule": "no hot patches"}
}"#;

/// Same contracts, but the vertex is still in draft.
pub const DRAFT_MANIFEST: &str = r#"{
  "vertex": "TEST",
  "version": "1.0.0",
  "status": "draft",
  "frozen_at": "",
  "contracts": [
    {"name": "X", "version": "1.0.0", "status": "draft", "schema_hash": "abc123"}
  ],
  "governance": {"change_request_types": ["feedback_item"], "rule": "no hot patches"}
}"#;

/// Remote reply listing `X` at `version`.
#[must_use]
pub fn remote_at(version: &str) -> Result<RemoteContracts, ContractSourceError> {
    Ok(RemoteContracts {
        contracts: vec![RemoteContract {
            name: "X".to_string(),
            version: Some(version.to_string()),
            schema_hash: Some("abc123".to_string()),
        }],
        manifest_hash: None,
    })
}

// ============================================================================
// SECTION: Contract Source
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
// SECTION: Command Runner
// ============================================================================

/// One recorded runner invocation.
#[derive(Debug, Clone)]
pub struct RunnerCall {
    /// Program name.
    pub program: String,
    /// Arguments.
    pub args: Vec<String>,
    /// Requested timeout.
    pub timeout: Duration,
}

/// Runner that records calls and replays scripted outputs.
#[derive(Default)]
pub struct FakeRunner {
    /// Outputs returned in order; a success with empty output once exhausted.
    outputs: Mutex<VecDeque<Result<CommandOutput, HandlerError>>>,
    /// Recorded calls.
    calls: Mutex<Vec<RunnerCall>>,
}

impl FakeRunner {
    /// Creates a runner replaying `outputs`.
    #[must_use]
    pub fn new(outputs: Vec<Result<CommandOutput, HandlerError>>) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Returns recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HandlerError> {
        self.calls.lock().unwrap().push(RunnerCall {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
        });
        self.outputs.lock().unwrap().pop_front().unwrap_or_else(|| Ok(CommandOutput::default()))
    }
}

/// Successful output with `stdout`.
#[must_use]
pub fn output(status: i32, stdout: &str, stderr: &str) -> Result<CommandOutput, HandlerError> {
    Ok(CommandOutput {
        status,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}

// ============================================================================
// SECTION: Fixture
// ============================================================================

/// Shared collaborators for one test.
pub struct Fixture {
    /// Workspace root holding `proj-a` and `proj-b`.
    pub root: TempDir,
    /// Audit log directory.
    pub audit_dir: TempDir,
    /// Manual clock driving the handshake.
    pub clock: Arc<ManualClock>,
    /// Scripted contract source.
    pub source: Arc<ScriptedSource>,
    /// Loaded manifest.
    pub manifest: Arc<FreezeManifestStore>,
    /// Contract handshake.
    pub handshake: Arc<ContractHandshake>,
    /// Workspace registry over `root`.
    pub workspaces: Arc<WorkspaceRegistry>,
    /// File audit sink under `audit_dir`.
    pub audit: Arc<FileAuditSink>,
    /// Frozen schema baselines, empty until a test registers one.
    pub schemas: Arc<SchemaIntegrity>,
}

impl Fixture {
    /// Fixture over the frozen manifest with a matching remote.
    #[must_use]
    pub fn frozen() -> Self {
        Self::new(FROZEN_MANIFEST, vec![remote_at("1.0.0")])
    }

    /// Fixture over `manifest` with scripted remote `replies`.
    #[must_use]
    pub fn new(manifest: &str, replies: Vec<Result<RemoteContracts, ContractSourceError>>) -> Self {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("proj-a")).unwrap();
        fs::create_dir(root.path().join("proj-b")).unwrap();
        fs::create_dir(root.path().join(".hidden")).unwrap();
        let audit_dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new());
        let source = ScriptedSource::new(replies);
        let manifest = Arc::new(FreezeManifestStore::from_bytes(manifest.as_bytes()).unwrap());
        let handshake = Arc::new(ContractHandshake::new(
            Arc::clone(&manifest),
            Some(Arc::clone(&source) as Arc<dyn ContractSource>),
            HandshakeConfig {
                max_attempts: 3,
                backoff_base: Duration::from_secs(2),
                cache_ttl: Duration::from_secs(3600),
            },
            clock.clone(),
        ));
        let workspaces = Arc::new(WorkspaceRegistry::new(root.path()));
        let audit = Arc::new(FileAuditSink::new(audit_dir.path().join("audit")));
        Self {
            root,
            audit_dir,
            clock,
            source,
            manifest,
            handshake,
            workspaces,
            audit,
            schemas: Arc::new(SchemaIntegrity::new()),
        }
    }

    /// Builds a router over `registry`.
    #[must_use]
    pub fn router(&self, registry: ToolRegistry, recheck: RecheckPolicy) -> ToolRouter {
        ToolRouter::new(ToolRouterConfig {
            registry,
            manifest: Arc::clone(&self.manifest),
            handshake: Arc::clone(&self.handshake),
            workspaces: Arc::clone(&self.workspaces),
            audit: self.audit.clone(),
            schemas: Arc::clone(&self.schemas),
            recheck,
        })
    }

    /// Builds handler services with `runner` and a vendor batch limit of two.
    #[must_use]
    pub fn services(&self, runner: Arc<FakeRunner>) -> ToolServices {
        let limiter = Arc::new(VendorRateLimiter::new(600, self.clock.clone()));
        let breaker = Arc::new(VendorCircuitBreaker::new(
            CircuitBreakerConfig {
                threshold: 2,
                reset_window: Duration::from_secs(300),
            },
            self.clock.clone(),
        ));
        let pricing = VendorPricing::new(
            VendorPricingConfig {
                max_line_items: 2,
                ..VendorPricingConfig::default()
            },
            default_adapters().unwrap(),
            limiter,
            breaker,
            self.clock.clone(),
        )
        .unwrap();
        ToolServices {
            workspaces: Arc::clone(&self.workspaces),
            runner,
            pricing: Arc::new(pricing),
            manifest: Arc::clone(&self.manifest),
            audit: self.audit.clone(),
            approvals: Arc::new(ApprovalStore::new()),
            settings: ToolSettings {
                sandbox_container: "agent-runner".to_string(),
                browser_container: "agent-browser".to_string(),
                sandbox_timeout: Duration::from_secs(120),
                github: GithubConfig::default(),
                active_model: "yolov8s-blueprint-v2".to_string(),
            },
        }
    }

    /// Returns parsed audit log lines.
    #[must_use]
    pub fn audit_lines(&self) -> Vec<Value> {
        let path = self.audit_dir.path().join("audit").join(AUDIT_FILE_NAME);
        let Ok(text) = fs::read_to_string(path) else {
            return Vec::new();
        };
        text.lines().map(|line| serde_json::from_str(line).unwrap()).collect()
    }
}

// ============================================================================
// SECTION: Registries
// ============================================================================

/// Registry of small stub tools.
///
/// - `x_tool`: frozen, echoes its arguments.
/// - `ws_tool`: workspace-tagged, requires a `workspace` argument.
/// - `plain`: untagged, returns `{ok: true}`.
/// - `soft_fail`: returns `{ok: false, error_code: "NO_DATA"}` without raising.
/// - `boom`: raises the error named by its `kind` argument.
#[must_use]
pub fn stub_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("x_tool", "frozen stub", json!({"type": "object"})).frozen(),
        |arguments: Value| Ok(json!({"ok": true, "echo": arguments})),
    );
    registry.register(
        ToolDefinition::new("ws_tool", "workspace stub", json!({"type": "object"})).workspace(),
        |arguments: Value| match arguments.get("workspace").and_then(Value::as_str) {
            Some(workspace) => Ok(json!({"ok": true, "workspace": workspace})),
            None => Err(HandlerError::MissingField("missing field `workspace`".to_string())),
        },
    );
    registry.register(
        ToolDefinition::new("plain", "plain stub", json!({"type": "object"})),
        |_arguments: Value| Ok(json!({"ok": true})),
    );
    registry.register(
        ToolDefinition::new("soft_fail", "soft failure stub", json!({"type": "object"})),
        |_arguments: Value| Ok(json!({"ok": false, "error_code": "NO_DATA", "message": "nothing"})),
    );
    registry.register(
        ToolDefinition::new("boom", "raising stub", json!({"type": "object"})),
        |arguments: Value| {
            let kind = arguments.get("kind").and_then(Value::as_str).unwrap_or("internal");
            Err(match kind {
                "not_found" => HandlerError::NotFound("no such file".to_string()),
                "timeout" => HandlerError::Timeout("timeout after 5s".to_string()),
                "index" => HandlerError::IndexOutOfRange("page 9 out of range".to_string()),
                _ => HandlerError::Internal("unexpected".to_string()),
            })
        },
    );
    registry
}
