// agent-router-server/src/handlers/repo.rs
// ============================================================================
// Module: Repository Tools
// Description: Git commits and GitHub pull requests for a workspace.
// Purpose: Let agents persist their work through version control.
// Dependencies: reqwest, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Git runs inside the sandbox container with argument arrays, never through
//! an interpolated shell string. Pull requests are opened through the GitHub
//! REST API with the configured token.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use agent_router_config::GithubConfig;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::info;

use super::ToolServices;
use super::sandbox::CommandOutput;
use super::sandbox::docker_exec_args;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Timeout for git commands.
const GIT_TIMEOUT: Duration = Duration::from_secs(120);
/// Timeout for GitHub API calls.
const GITHUB_TIMEOUT: Duration = Duration::from_secs(30);
/// User agent sent to GitHub.
const GITHUB_USER_AGENT: &str = "agent-router/0.1";

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// `repo_commit` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommitArgs {
    /// Workspace id.
    workspace: String,
    /// Commit message.
    message: String,
    /// Stage every change before committing.
    #[serde(default = "default_true")]
    add_all: bool,
}

/// `repo_open_pr` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OpenPrArgs {
    /// Workspace id.
    workspace: String,
    /// Pull request title.
    title: String,
    /// Pull request body.
    body: String,
    /// Branch to push and open from.
    head_branch: String,
    /// Target branch; defaults to the configured branch.
    #[serde(default)]
    base_branch: Option<String>,
}

/// Serde default of `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Git
// ============================================================================

/// Runs `git <args>` in the sandbox container for `workspace`.
fn git(services: &ToolServices, workspace: &str, args: &[&str]) -> Result<CommandOutput, HandlerError> {
    let workdir = services.workspaces.workspace_dir(workspace)?;
    let mut command = vec!["git"];
    command.extend_from_slice(args);
    let argv = docker_exec_args(&workdir, &services.settings.sandbox_container, &command);
    services.runner.run("docker", &argv, GIT_TIMEOUT)
}

/// Returns true when git reported a clean tree.
fn nothing_to_commit(output: &CommandOutput) -> bool {
    output.stdout.contains("nothing to commit") || output.stderr.contains("nothing to commit")
}

// ============================================================================
// SECTION: GitHub
// ============================================================================

/// Minimal GitHub pull request client.
struct GithubClient {
    /// Repository settings.
    config: GithubConfig,
    /// Blocking HTTP client.
    client: Client,
}

impl GithubClient {
    /// Builds the client.
    fn new(config: GithubConfig) -> Result<Self, HandlerError> {
        let client = Client::builder()
            .timeout(GITHUB_TIMEOUT)
            .user_agent(GITHUB_USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|err| HandlerError::Internal(format!("github client build failed: {err}")))?;
        Ok(Self { config, client })
    }

    /// Opens a pull request and returns the response body.
    fn open_pull_request(
        &self,
        title: &str,
        body: &str,
        head: &str,
        base: &str,
    ) -> Result<Value, HandlerError> {
        let (Some(owner), Some(repo), Some(token)) =
            (&self.config.owner, &self.config.repo, &self.config.token)
        else {
            return Err(HandlerError::Runtime(
                "GitHub is not configured (GITHUB_OWNER, GITHUB_REPO, GITHUB_TOKEN)".to_string(),
            ));
        };
        let url = format!("{}/repos/{owner}/{repo}/pulls", self.config.api_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, format!("token {token}"))
            .header(ACCEPT, "application/vnd.github+json")
            .json(&json!({"title": title, "body": body, "head": head, "base": base}))
            .send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(HandlerError::Runtime(format!(
                "GitHub PR creation failed ({}): {text}",
                status.as_u16()
            )));
        }
        serde_json::from_str(&text)
            .map_err(|err| HandlerError::Runtime(format!("invalid GitHub response: {err}")))
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Registers `repo_commit` and `repo_open_pr`.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) -> Result<(), HandlerError> {
    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "repo_commit",
            "Commit changes in a workspace git repository.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string"},
                    "message": {"type": "string"},
                    "add_all": {"type": "boolean", "default": true}
                },
                "required": ["workspace", "message"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: CommitArgs = parse_args(arguments)?;
            if args.add_all {
                let added = git(&shared, &args.workspace, &["add", "-A"])?;
                if !added.success() {
                    return Ok(added.to_value());
                }
            }
            let committed = git(&shared, &args.workspace, &["commit", "-m", &args.message])?;
            if nothing_to_commit(&committed) {
                return Ok(json!({"ok": true, "note": "nothing to commit"}));
            }
            Ok(committed.to_value())
        },
    );

    let shared = services.clone();
    let github = GithubClient::new(services.settings.github.clone())?;
    registry.register(
        ToolDefinition::new(
            "repo_open_pr",
            "Push a branch from a workspace and open a GitHub pull request.",
            json!({
                "type": "object",
                "properties": {
                    "workspace": {"type": "string"},
                    "title": {"type": "string"},
                    "body": {"type": "string"},
                    "head_branch": {"type": "string"},
                    "base_branch": {"type": "string"}
                },
                "required": ["workspace", "title", "body", "head_branch"]
            }),
        )
        .workspace(),
        move |arguments: Value| {
            let args: OpenPrArgs = parse_args(arguments)?;
            let pushed =
                git(&shared, &args.workspace, &["push", "-u", "origin", &args.head_branch])?;
            if !pushed.success() {
                return Err(HandlerError::Runtime(format!(
                    "git push failed: {}",
                    pushed.stderr.trim()
                )));
            }
            let base = args.base_branch.as_deref().unwrap_or(&github.config.default_branch);
            let pr = github.open_pull_request(&args.title, &args.body, &args.head_branch, base)?;
            info!(workspace = %args.workspace, head = %args.head_branch, "pull request opened");
            Ok(json!({
                "ok": true,
                "pr_url": pr.get("html_url").cloned().unwrap_or(Value::Null),
                "number": pr.get("number").cloned().unwrap_or(Value::Null),
            }))
        },
    );
    Ok(())
}
