// agent-router-server/tests/dispatch.rs
// ============================================================================
// Module: Dispatch Pipeline Tests
// Description: Tests for gates, error classification, stamping, and audit.
// ============================================================================
//! ## Overview
//! Runs stub tools through [`ToolRouter::dispatch`] against scratch
//! workspaces, a scripted handshake, and a real file audit sink.
//!
//! [`ToolRouter::dispatch`]: agent_router_server::ToolRouter::dispatch

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use agent_router_config::RecheckPolicy;
use agent_router_core::ContractSourceError;
use agent_router_server::AuditSink;
use agent_router_server::DispatchError;
use agent_router_server::ErrorCode;
use agent_router_server::FileAuditSink;
use agent_router_server::ToolCallRecord;
use agent_router_server::ToolDefinition;
use agent_router_server::ToolRouter;
use agent_router_server::ToolRouterConfig;
use common::Fixture;
use common::remote_at;
use common::stub_registry;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Unknown Tools
// ============================================================================

/// Tests an unknown tool yields a business error, not a transport error.
#[test]
fn test_unknown_tool_returns_envelope() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("nope", json!({})).unwrap();
    assert_eq!(response["ok"], json!(false));
    assert_eq!(response["error_code"], json!("UNKNOWN_TOOL"));
    assert_eq!(response["message"], json!("Unknown tool: nope"));
    assert_eq!(response["tool"], json!("nope"));
    assert!(response.get("vertex").is_none());
}

// ============================================================================
// SECTION: Frozen Gate
// ============================================================================

/// Tests a frozen tool is blocked before the handshake runs.
#[test]
fn test_frozen_tool_blocked_when_unattempted() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let err = router.dispatch("x_tool", json!({})).unwrap_err();
    let DispatchError::ContractMismatch {
        tool,
        reason,
        handshake_errors,
    } = &err
    else {
        panic!("expected contract mismatch");
    };
    assert_eq!(tool, "x_tool");
    assert_eq!(reason, "Contract handshake has not been run");
    assert!(handshake_errors.is_empty());
    assert_eq!(err.detail()["error"], json!("CONTRACT_MISMATCH"));
    assert_eq!(fixture.source.calls(), 0);
}

/// Tests a frozen tool runs and is stamped once the handshake passes.
#[test]
fn test_frozen_tool_runs_after_handshake() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    assert!(fixture.handshake.run());
    let response = router.dispatch("x_tool", json!({"a": 1})).unwrap();
    assert_eq!(response["ok"], json!(true));
    assert_eq!(response["echo"], json!({"a": 1}));
    assert_eq!(response["vertex"], fixture.manifest.vertex_stamp_value());
    assert_eq!(response["vertex"]["vertex"], json!("TEST"));
}

/// Tests a version drift keeps frozen tools blocked with the drift reported.
#[test]
fn test_version_mismatch_blocks_frozen_tool() {
    let fixture = Fixture::new(common::FROZEN_MANIFEST, vec![remote_at("2.0.0")]);
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    assert!(!fixture.handshake.run());
    assert_eq!(fixture.source.calls(), 1);
    let err = router.dispatch("x_tool", json!({})).unwrap_err();
    let DispatchError::ContractMismatch {
        handshake_errors,
        reason,
        ..
    } = err
    else {
        panic!("expected contract mismatch");
    };
    assert!(!handshake_errors.is_empty());
    assert!(handshake_errors.iter().any(|e| e.contains("version mismatch")));
    assert!(reason.contains("version mismatch"));
}

/// Tests frozen tools are not gated while the vertex is not frozen.
#[test]
fn test_draft_vertex_does_not_gate() {
    let fixture = Fixture::new(common::DRAFT_MANIFEST, vec![remote_at("9.9.9")]);
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("x_tool", json!({})).unwrap();
    assert_eq!(response["ok"], json!(true));
    assert_eq!(fixture.source.calls(), 0);
}

/// Tests non-frozen tools run regardless of the handshake.
#[test]
fn test_plain_tool_ignores_handshake() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("plain", json!({})).unwrap();
    assert_eq!(response["ok"], json!(true));
}

/// Tests the startup policy never re-runs a stale verdict.
#[test]
fn test_startup_policy_does_not_recheck() {
    let fixture = Fixture::new(common::FROZEN_MANIFEST, vec![
        Err(ContractSourceError::Transport("down".to_string())),
        Err(ContractSourceError::Transport("down".to_string())),
        Err(ContractSourceError::Transport("down".to_string())),
        remote_at("1.0.0"),
    ]);
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    assert!(!fixture.handshake.run());
    fixture.clock.advance(Duration::from_secs(7200));
    assert!(router.dispatch("x_tool", json!({})).is_err());
    assert_eq!(fixture.source.calls(), 3);
}

/// Tests the on-call policy re-runs a stale verdict inside the gate.
#[test]
fn test_on_frozen_call_policy_rechecks_stale_verdict() {
    let fixture = Fixture::new(common::FROZEN_MANIFEST, vec![
        Err(ContractSourceError::Transport("down".to_string())),
        Err(ContractSourceError::Transport("down".to_string())),
        Err(ContractSourceError::Transport("down".to_string())),
        remote_at("1.0.0"),
    ]);
    let router = fixture.router(stub_registry(), RecheckPolicy::OnFrozenCall);
    assert!(!fixture.handshake.run());
    assert_eq!(fixture.source.calls(), 3);

    // Fresh failure: not stale, so no re-run.
    assert!(router.dispatch("x_tool", json!({})).is_err());
    assert_eq!(fixture.source.calls(), 3);

    fixture.clock.advance(Duration::from_secs(3601));
    let response = router.dispatch("x_tool", json!({})).unwrap();
    assert_eq!(response["ok"], json!(true));
    assert_eq!(fixture.source.calls(), 4);
}

/// Tests concurrent gate checks share one handshake run.
#[test]
fn test_concurrent_recheck_runs_once() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::OnFrozenCall);
    let handles: Vec<_> = (0 .. 8)
        .map(|_| {
            let router = router.clone();
            thread::spawn(move || router.dispatch("x_tool", json!({})).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(fixture.source.calls(), 1);
}

// ============================================================================
// SECTION: Workspace Gate
// ============================================================================

/// Tests an unknown workspace yields the exact registered list.
#[test]
fn test_unknown_workspace_lists_available() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let args = json!({"workspace": "missing", "extra": true});
    let err = router.dispatch("ws_tool", args.clone()).unwrap_err();
    assert_eq!(err.code(), ErrorCode::WorkspaceNotFound);
    let detail = err.detail();
    assert_eq!(detail["tool"], json!("ws_tool"));
    assert_eq!(detail["args"], args);
    assert_eq!(detail["reason"], json!("Workspace 'missing' not found"));
    assert_eq!(detail["availableWorkspaces"], json!(["proj-a", "proj-b"]));
}

/// Tests a registered workspace passes the gate.
#[test]
fn test_known_workspace_passes() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("ws_tool", json!({"workspace": "proj-b"})).unwrap();
    assert_eq!(response["workspace"], json!("proj-b"));
}

/// Tests a listed workspace whose name contains `..` passes the gate.
#[test]
fn test_listed_dotted_workspace_passes() {
    let fixture = Fixture::frozen();
    std::fs::create_dir(fixture.root.path().join("v1..2")).unwrap();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let err = router.dispatch("ws_tool", json!({"workspace": "missing"})).unwrap_err();
    assert_eq!(err.detail()["availableWorkspaces"], json!(["proj-a", "proj-b", "v1..2"]));
    let response = router.dispatch("ws_tool", json!({"workspace": "v1..2"})).unwrap();
    assert_eq!(response["workspace"], json!("v1..2"));
}

/// Tests the frozen gate runs before the workspace gate.
#[test]
fn test_frozen_gate_precedes_workspace_gate() {
    let fixture = Fixture::frozen();
    let mut registry = stub_registry();
    registry.register(
        ToolDefinition::new("frozen_ws", "frozen workspace stub", json!({"type": "object"}))
            .frozen()
            .workspace(),
        |arguments: Value| Ok(json!({"ok": true, "echo": arguments})),
    );
    let router = fixture.router(registry, RecheckPolicy::Startup);
    let err = router.dispatch("frozen_ws", json!({"workspace": "missing"})).unwrap_err();
    assert_eq!(err.code(), ErrorCode::ContractMismatch);

    assert!(fixture.handshake.run());
    let err = router.dispatch("frozen_ws", json!({"workspace": "missing"})).unwrap_err();
    assert_eq!(err.code(), ErrorCode::WorkspaceNotFound);
}

/// Tests an absent workspace argument is left to the handler.
#[test]
fn test_absent_workspace_defers_to_handler() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("ws_tool", json!({})).unwrap();
    assert_eq!(response["ok"], json!(false));
    assert_eq!(response["error_code"], json!("MISSING_FIELD"));
}

/// Tests untagged tools never consult the workspace registry.
#[test]
fn test_untagged_tool_ignores_workspace_argument() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("plain", json!({"workspace": "missing"})).unwrap();
    assert_eq!(response["ok"], json!(true));
}

// ============================================================================
// SECTION: Error Classification
// ============================================================================

/// Tests handler failures map to stable codes and carry the vertex stamp.
#[test]
fn test_handler_errors_are_classified() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    for (kind, code, message) in [
        ("not_found", "FILE_NOT_FOUND", "no such file"),
        ("timeout", "TIMEOUT", "timeout after 5s"),
        ("index", "INDEX_OUT_OF_RANGE", "page 9 out of range"),
        ("other", "INTERNAL_ERROR", "unexpected"),
    ] {
        let response = router.dispatch("boom", json!({"kind": kind})).unwrap();
        assert_eq!(response["ok"], json!(false));
        assert_eq!(response["error_code"], json!(code));
        assert_eq!(response["message"], json!(message));
        assert_eq!(response["tool"], json!("boom"));
        assert_eq!(response["vertex"], fixture.manifest.vertex_stamp_value());
    }
}

/// Tests soft failures pass through unstamped.
#[test]
fn test_soft_failure_is_not_stamped() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let response = router.dispatch("soft_fail", json!({})).unwrap();
    assert_eq!(response, json!({"ok": false, "error_code": "NO_DATA", "message": "nothing"}));
}

/// Tests an existing vertex key is preserved.
#[test]
fn test_existing_vertex_is_preserved() {
    let fixture = Fixture::frozen();
    let mut registry = stub_registry();
    registry.register(
        agent_router_server::ToolDefinition::new("pre_stamped", "", json!({"type": "object"})),
        |_arguments: Value| Ok(json!({"ok": true, "vertex": "custom"})),
    );
    let router = fixture.router(registry, RecheckPolicy::Startup);
    let response = router.dispatch("pre_stamped", json!({})).unwrap();
    assert_eq!(response["vertex"], json!("custom"));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Tests every dispatch outcome writes exactly one audit line.
#[test]
fn test_one_audit_line_per_dispatch() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    router.dispatch("plain", json!({})).unwrap();
    router.dispatch("soft_fail", json!({})).unwrap();
    router.dispatch("boom", json!({"kind": "timeout"})).unwrap();
    router.dispatch("nope", json!({})).unwrap();
    router.dispatch("x_tool", json!({})).unwrap_err();
    router.dispatch("ws_tool", json!({"workspace": "zzz"})).unwrap_err();

    let lines = fixture.audit_lines();
    assert_eq!(lines.len(), 6);
    let summary: Vec<(String, bool, Option<String>)> = lines
        .iter()
        .map(|line| {
            (
                line["tool_name"].as_str().unwrap().to_string(),
                line["ok"].as_bool().unwrap(),
                line.get("error_code").and_then(Value::as_str).map(str::to_string),
            )
        })
        .collect();
    assert_eq!(summary, vec![
        ("plain".to_string(), true, None),
        ("soft_fail".to_string(), false, Some("NO_DATA".to_string())),
        ("boom".to_string(), false, Some("TIMEOUT".to_string())),
        ("nope".to_string(), false, Some("UNKNOWN_TOOL".to_string())),
        ("x_tool".to_string(), false, Some("CONTRACT_MISMATCH".to_string())),
        ("ws_tool".to_string(), false, Some("WORKSPACE_NOT_FOUND".to_string())),
    ]);
    assert!(lines.iter().all(|line| line["duration_ms"].as_f64().unwrap() >= 0.0));
    assert!(lines.iter().all(|line| line["timestamp"].as_str().unwrap().ends_with('Z')));
}

/// Tests an unwritable audit directory never fails the call.
#[test]
fn test_audit_failure_is_swallowed() {
    let fixture = Fixture::frozen();
    let blocker = fixture.audit_dir.path().join("blocker");
    std::fs::write(&blocker, b"file, not a directory").unwrap();
    let router = ToolRouter::new(ToolRouterConfig {
        registry: stub_registry(),
        manifest: Arc::clone(&fixture.manifest),
        handshake: Arc::clone(&fixture.handshake),
        workspaces: Arc::clone(&fixture.workspaces),
        audit: Arc::new(FileAuditSink::new(blocker.join("nested"))),
        schemas: Arc::clone(&fixture.schemas),
        recheck: RecheckPolicy::Startup,
    });
    let response = router.dispatch("plain", json!({})).unwrap();
    assert_eq!(response["ok"], json!(true));
}

/// Tests concurrent appends produce only whole JSON lines.
#[test]
fn test_concurrent_audit_appends_keep_lines_whole() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 40;
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(FileAuditSink::new(dir.path().join("audit")));
    let handles: Vec<_> = (0 .. THREADS)
        .map(|worker| {
            let sink = Arc::clone(&sink);
            thread::spawn(move || {
                for call in 0 .. PER_THREAD {
                    let mut record = ToolCallRecord::new("plain", true, None, 1.0);
                    let mut extra = Map::new();
                    extra.insert("worker".to_string(), json!(worker));
                    extra.insert("call".to_string(), json!(call));
                    extra.insert("padding".to_string(), json!("x".repeat(8 * 1024)));
                    record.extra = Some(extra);
                    sink.record_tool_call(&record);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let text = std::fs::read_to_string(sink.path()).unwrap();
    let lines: Vec<Value> =
        text.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), THREADS * PER_THREAD);
    for worker in 0 .. THREADS {
        let count = lines.iter().filter(|line| line["extra"]["worker"] == json!(worker)).count();
        assert_eq!(count, PER_THREAD);
    }
}

// ============================================================================
// SECTION: Listing
// ============================================================================

/// Tests tool listing uses the function-calling shape in registration order.
#[test]
fn test_list_tools_shape() {
    let fixture = Fixture::frozen();
    let router = fixture.router(stub_registry(), RecheckPolicy::Startup);
    let tools = router.list_tools();
    assert_eq!(tools.len(), 5);
    assert_eq!(tools[0]["type"], json!("function"));
    assert_eq!(tools[0]["function"]["name"], json!("x_tool"));
    assert_eq!(tools[0]["function"]["parameters"], json!({"type": "object"}));
    assert_eq!(router.registry().frozen_tools(), vec!["x_tool"]);
}
