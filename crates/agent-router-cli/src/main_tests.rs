// agent-router-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Unit Tests
// Description: Argument parsing, log format selection, and manifest output.
// Purpose: Cover CLI behavior that does not need a spawned process.
// Dependencies: clap, agent-router-core
// ============================================================================

//! ## Overview
//! Exercises the clap surface and the pure helpers behind the subcommands.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use agent_router_core::FreezeManifestStore;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::LogFormat;
use super::log_format;
use super::manifest_summary;

// ============================================================================
// SECTION: Tests
// ============================================================================

/// Tests the global `--config` flag parses after a subcommand.
#[test]
fn parses_global_config_after_subcommand() {
    let cli = Cli::try_parse_from(["agent-router", "tools", "--config", "/etc/router.toml"])
        .expect("parse");
    assert_eq!(cli.config, Some(PathBuf::from("/etc/router.toml")));
    assert!(matches!(cli.command, Commands::Tools));
}

/// Tests `manifest --path` captures the override.
#[test]
fn parses_manifest_path() {
    let cli = Cli::try_parse_from(["agent-router", "manifest", "--path", "m.json"]).expect("parse");
    match cli.command {
        Commands::Manifest(command) => assert_eq!(command.path, Some(PathBuf::from("m.json"))),
        _ => panic!("expected manifest command"),
    }
}

/// Tests the nested `config validate` subcommand.
#[test]
fn parses_config_validate() {
    let cli = Cli::try_parse_from(["agent-router", "config", "validate"]).expect("parse");
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate
        }
    ));
}

/// Tests unknown subcommands are rejected.
#[test]
fn rejects_unknown_subcommand() {
    assert!(Cli::try_parse_from(["agent-router", "launch"]).is_err());
}

/// Tests only `json` selects JSON logs.
#[test]
fn log_format_defaults_to_text() {
    assert_eq!(log_format(None), LogFormat::Text);
    assert_eq!(log_format(Some("pretty")), LogFormat::Text);
    assert_eq!(log_format(Some(" JSON ")), LogFormat::Json);
}

/// Tests the manifest summary carries stamp, hash, and action lists.
#[test]
fn manifest_summary_lists_governance_sections() {
    let store = FreezeManifestStore::bundled().expect("bundled manifest");
    let summary = manifest_summary(&store);
    assert_eq!(summary["vertex"]["vertex"], "IBEW_LV");
    assert_eq!(summary["frozen"], true);
    assert_eq!(summary["manifest_hash"], store.manifest_hash());
    let locked = summary["locked_contracts"].as_array().expect("locked list");
    assert!(locked.iter().any(|name| name == "BlueprintParseV1"));
    assert!(summary["prohibited_actions"].is_array());
    assert!(summary["allowed_actions"].is_array());
}
