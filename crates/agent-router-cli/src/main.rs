// agent-router-cli/src/main.rs
// ============================================================================
// Module: Agent Router CLI Entry Point
// Description: Command dispatcher for the agent router server and diagnostics.
// Purpose: Start the router and inspect its governance state from a shell.
// Dependencies: clap, agent-router-config, agent-router-core, agent-router-server, tokio, tracing
// ============================================================================

//! ## Overview
//! `agent-router serve` runs the contract handshake and starts the HTTP
//! server. `handshake`, `manifest`, `tools`, and `config validate` inspect
//! the same wiring without binding a port. JSON goes to stdout; logs go to
//! stderr. A failed handshake exits with status 78 (configuration error).

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use agent_router_config::RouterConfig;
use agent_router_core::FreezeManifestStore;
use agent_router_server::RouterServer;
use agent_router_server::ServerError;
use agent_router_server::build_tool_router;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit status when the contract handshake fails (`EX_CONFIG`).
const EXIT_HANDSHAKE_FAILED: u8 = 78;
/// Environment variable selecting the log format.
const LOG_FORMAT_ENV: &str = "ROUTER_LOG_FORMAT";
/// Default log filter when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "agent-router", version, disable_help_subcommand = true)]
struct Cli {
    /// TOML configuration file (overrides `AGENT_ROUTER_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the contract handshake and start the HTTP server.
    Serve,
    /// Run the contract handshake once and print its status.
    Handshake,
    /// Print the freeze manifest summary.
    Manifest(ManifestCommand),
    /// Print the registered tool schemas.
    Tools,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `manifest`.
#[derive(Args, Debug)]
struct ManifestCommand {
    /// Manifest file; defaults to the configured or bundled manifest.
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate configuration, then exit.
    Validate,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the exit status to use.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
    /// Process exit status.
    exit: u8,
}

impl CliError {
    /// Constructs a general failure.
    const fn new(message: String) -> Self {
        Self {
            message,
            exit: 1,
        }
    }

    /// Constructs a handshake failure.
    const fn handshake(message: String) -> Self {
        Self {
            message,
            exit: EXIT_HANDSHAKE_FAILED,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    init_tracing(log_format(std::env::var(LOG_FORMAT_ENV).ok().as_deref()));
    match cli.command {
        Commands::Serve => command_serve(cli.config.as_deref()).await,
        Commands::Handshake => command_handshake(cli.config.as_deref()).await,
        Commands::Manifest(command) => command_manifest(cli.config.as_deref(), &command),
        Commands::Tools => command_tools(cli.config.as_deref()).await,
        Commands::Config {
            command: ConfigCommand::Validate,
        } => command_config_validate(cli.config.as_deref()),
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Parses the log format setting; anything but `json` means text.
fn log_format(value: Option<&str>) -> LogFormat {
    match value.map(str::trim) {
        Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

/// Installs the global tracing subscriber writing to stderr.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => {
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)).try_init()
        }
    };
    if result.is_err() {
        let _ = write_stderr_line("tracing subscriber already installed");
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Loads configuration, mapping failures to CLI errors.
fn load_config(path: Option<&Path>) -> CliResult<RouterConfig> {
    RouterConfig::load(path).map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

/// Executes the `serve` command.
async fn command_serve(path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(path)?;
    let server = tokio::task::spawn_blocking(move || RouterServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    match server.serve().await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err @ ServerError::HandshakeRequired {
            ..
        }) => Err(CliError::handshake(err.to_string())),
        Err(err) => Err(CliError::new(format!("server failed: {err}"))),
    }
}

/// Executes the `handshake` command.
async fn command_handshake(path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(path)?;
    let status = tokio::task::spawn_blocking(move || {
        let router = build_tool_router(&config)?;
        let passed = router.handshake().run();
        Ok::<_, ServerError>((passed, router.handshake().status()))
    })
    .await
    .map_err(|err| CliError::new(format!("handshake join failed: {err}")))?
    .map_err(|err| CliError::new(format!("router init failed: {err}")))?;
    let (passed, status) = status;
    write_json(&json!(status))?;
    info!(passed, "handshake command finished");
    if passed {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_HANDSHAKE_FAILED))
    }
}

/// Executes the `manifest` command.
fn command_manifest(config_path: Option<&Path>, command: &ManifestCommand) -> CliResult<ExitCode> {
    let manifest_path = match &command.path {
        Some(path) => Some(path.clone()),
        None => load_config(config_path)?.manifest.path,
    };
    let store = match &manifest_path {
        Some(path) => FreezeManifestStore::open(path),
        None => FreezeManifestStore::bundled(),
    }
    .map_err(|err| CliError::new(format!("failed to load manifest: {err}")))?;
    write_json(&manifest_summary(&store))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the `manifest` command output.
fn manifest_summary(store: &FreezeManifestStore) -> Value {
    json!({
        "vertex": store.vertex_stamp_value(),
        "manifest_hash": store.manifest_hash(),
        "frozen": store.is_frozen(),
        "locked_contracts": store.locked_contracts(),
        "prohibited_actions": store.prohibited_actions(),
        "allowed_actions": store.allowed_actions(),
    })
}

/// Executes the `tools` command.
async fn command_tools(path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(path)?;
    let tools = tokio::task::spawn_blocking(move || {
        build_tool_router(&config).map(|router| router.list_tools())
    })
    .await
    .map_err(|err| CliError::new(format!("router init join failed: {err}")))?
    .map_err(|err| CliError::new(format!("router init failed: {err}")))?;
    write_json(&json!({"tools": tools}))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `config validate` command.
fn command_config_validate(path: Option<&Path>) -> CliResult<ExitCode> {
    let _config = load_config(path)?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes pretty JSON to stdout.
fn write_json(value: &Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns its exit code.
fn emit_error(err: &CliError) -> ExitCode {
    let _ = write_stderr_line(&err.message);
    ExitCode::from(err.exit)
}
