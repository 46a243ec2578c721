// agent-router-server/src/handlers/sandbox.rs
// ============================================================================
// Module: Sandbox Execution
// Description: Command execution inside the sandbox runner container.
// Purpose: Run agent shell commands in a workspace under a timeout.
// Dependencies: serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Commands run as `docker exec -w <workspace> <container> bash -lc <cmd>`.
//! Process spawning sits behind [`CommandRunner`] so handlers can be tested
//! without a container runtime. [`ProcessRunner`] drains stdout and stderr on
//! reader threads and polls the child until it exits or the deadline passes,
//! killing it on timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::warn;

use super::ToolServices;
use super::tail_chars;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Characters of stdout/stderr kept in responses.
pub const OUTPUT_TAIL_CHARS: usize = 20_000;
/// Upper bound accepted for `timeout_sec`.
const MAX_TIMEOUT_SECS: u64 = 1800;
/// Child polling interval.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Captured process result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `-1` when terminated by a signal.
    pub status: i32,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr.
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true for a zero exit status.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.status == 0
    }

    /// Renders the result with output tails.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "ok": self.success(),
            "returncode": self.status,
            "stdout": tail_chars(&self.stdout, OUTPUT_TAIL_CHARS),
            "stderr": tail_chars(&self.stderr, OUTPUT_TAIL_CHARS),
        })
    }
}

/// Spawns external programs.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Timeout`] when the deadline passes and an I/O
    /// classified error when the program cannot be started.
    fn run(&self, program: &str, args: &[String], timeout: Duration)
    -> Result<CommandOutput, HandlerError>;
}

/// Runs programs as local child processes.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<CommandOutput, HandlerError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = Instant::now() + timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                warn!(program, timeout_secs = timeout.as_secs(), "command timed out");
                return Err(HandlerError::Timeout(format!(
                    "timeout after {}s",
                    timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };
        Ok(CommandOutput {
            status: status.code().unwrap_or(-1),
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }
}

/// Reads a pipe to the end on a background thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let _ = pipe.read_to_end(&mut buffer);
        buffer
    })
}

/// Joins a reader thread and decodes its output lossily.
fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Builds `docker exec -w <dir> <container> <command...>` arguments.
#[must_use]
pub fn docker_exec_args(workdir: &Path, container: &str, command: &[&str]) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        "-w".to_string(),
        workdir.display().to_string(),
        container.to_string(),
    ];
    args.extend(command.iter().map(|part| (*part).to_string()));
    args
}

/// Runs a shell command in the sandbox container for `workspace`.
///
/// # Errors
///
/// Returns [`HandlerError`] for an invalid workspace, spawn failure, or timeout.
pub fn run_in_sandbox(
    services: &ToolServices,
    workspace: &str,
    cmd: &str,
    timeout: Duration,
) -> Result<CommandOutput, HandlerError> {
    let workdir = services.workspaces.workspace_dir(workspace)?;
    let args = docker_exec_args(&workdir, &services.settings.sandbox_container, &[
        "bash", "-lc", cmd,
    ]);
    services.runner.run("docker", &args, timeout)
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// `sandbox_run` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SandboxRunArgs {
    /// Workspace id.
    workspace: String,
    /// Shell command.
    cmd: String,
    /// Timeout override in seconds.
    #[serde(default)]
    timeout_sec: Option<u64>,
}

/// Registers `sandbox_run`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "sandbox_run",
            "Run a shell command inside the isolated runner container in a project workspace.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string", "description": "Workspace folder under WORKSPACE_ROOT, e.g. 'proj-123'"},
                    "cmd": {"type": "string", "description": "Shell command to run"},
                    "timeout_sec": {"type": "integer", "minimum": 1, "maximum": MAX_TIMEOUT_SECS}
                },
                "required": ["workspace", "cmd"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: SandboxRunArgs = parse_args(arguments)?;
            let timeout = match args.timeout_sec {
                None => shared.settings.sandbox_timeout,
                Some(secs) if (1 ..= MAX_TIMEOUT_SECS).contains(&secs) => Duration::from_secs(secs),
                Some(secs) => {
                    return Err(HandlerError::InvalidInput(format!(
                        "timeout_sec must be between 1 and {MAX_TIMEOUT_SECS}, got {secs}"
                    )));
                }
            };
            let output = run_in_sandbox(&shared, &args.workspace, &args.cmd, timeout)?;
            Ok(output.to_value())
        },
    );
}

// ============================================================================
// SECTION: Tests
// ============================================================================
