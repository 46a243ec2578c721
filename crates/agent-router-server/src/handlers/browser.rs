// agent-router-server/src/handlers/browser.rs
// ============================================================================
// Module: Browser Tools
// Description: Headless browser actions run in the browser container.
// Purpose: Let agents navigate and read web pages from a persistent session.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each call renders a short Playwright script and runs it with
//! `docker exec -w <workspace> <browser-container> python -c <script>`.
//! Sessions persist under `<workspace>/.browser/<session>/user_data`, so
//! consecutive calls share cookies and the open page. Every value spliced
//! into the script is encoded as a JSON string literal, which Python parses
//! identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use super::ToolServices;
use super::sandbox::docker_exec_args;
use crate::errors::HandlerError;
use crate::errors::parse_args;
use crate::tools::ToolDefinition;
use crate::tools::ToolRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Timeout for one browser script.
const BROWSER_TIMEOUT: Duration = Duration::from_secs(120);
/// Default session name.
const DEFAULT_SESSION: &str = "default";

// ============================================================================
// SECTION: Arguments
// ============================================================================

/// `browser_goto` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GotoArgs {
    /// Workspace id.
    workspace: String,
    /// Target URL.
    url: String,
    /// Session name.
    #[serde(default = "default_session")]
    session: String,
}

/// `browser_click` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClickArgs {
    /// Workspace id.
    workspace: String,
    /// CSS selector.
    selector: String,
    /// Session name.
    #[serde(default = "default_session")]
    session: String,
}

/// `browser_type` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeArgs {
    /// Workspace id.
    workspace: String,
    /// CSS selector.
    selector: String,
    /// Text to type.
    text: String,
    /// Session name.
    #[serde(default = "default_session")]
    session: String,
    /// Clear the field first.
    #[serde(default = "default_true")]
    clear_first: bool,
}

/// `browser_screenshot` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScreenshotArgs {
    /// Workspace id.
    workspace: String,
    /// Output path relative to the workspace.
    path: String,
    /// Session name.
    #[serde(default = "default_session")]
    session: String,
}

/// `browser_extract_text` arguments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractArgs {
    /// Workspace id.
    workspace: String,
    /// Session name.
    #[serde(default = "default_session")]
    session: String,
    /// Optional CSS selector; the whole body otherwise.
    #[serde(default)]
    selector: Option<String>,
}

/// Default session name.
fn default_session() -> String {
    DEFAULT_SESSION.to_string()
}

/// Serde default of `true`.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Script
// ============================================================================

/// Encodes `value` as a Python string literal.
fn py_str(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// Rejects session names that could escape the session directory.
fn check_session(session: &str) -> Result<(), HandlerError> {
    let valid = !session.is_empty()
        && session.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(HandlerError::InvalidInput(format!("Invalid session name: '{session}'")))
    }
}

/// Wraps `action` lines in a persistent-context Playwright script.
#[must_use]
pub fn playwright_script(workdir: &Path, session: &str, action: &[String]) -> String {
    let mut script = vec![
        "import os".to_string(),
        "from playwright.sync_api import sync_playwright".to_string(),
        format!("ws = {}", py_str(&workdir.display().to_string())),
        format!("session = {}", py_str(session)),
        "os.makedirs(os.path.join(ws, '.browser', session), exist_ok=True)".to_string(),
        "user_data_dir = os.path.join(ws, '.browser', session, 'user_data')".to_string(),
        "with sync_playwright() as p:".to_string(),
        "    browser = p.chromium.launch_persistent_context(user_data_dir, headless=True, \
         args=['--no-sandbox', '--disable-setuid-sandbox'])"
            .to_string(),
        "    page = browser.pages[0] if browser.pages else browser.new_page()".to_string(),
    ];
    script.extend(action.iter().map(|line| format!("    {line}")));
    script.push("    browser.close()".to_string());
    script.join("\n")
}

/// Runs a browser action for `workspace`.
fn run_action(
    services: &ToolServices,
    workspace: &str,
    session: &str,
    action: &[String],
) -> Result<Value, HandlerError> {
    check_session(session)?;
    let workdir = services.workspaces.workspace_dir(workspace)?;
    let script = playwright_script(&workdir, session, action);
    let args = docker_exec_args(&workdir, &services.settings.browser_container, &[
        "python", "-c", &script,
    ]);
    let output = services.runner.run("docker", &args, BROWSER_TIMEOUT)?;
    Ok(output.to_value())
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Schema fragment shared by every browser tool.
fn schema(properties: Value, required: &[&str]) -> Value {
    let mut props = json!({
        "workspace": {"type": "string"},
        "session": {"type": "string", "default": DEFAULT_SESSION}
    });
    if let (Some(target), Value::Object(extra)) = (props.as_object_mut(), properties) {
        target.extend(extra);
    }
    json!({"type": "object", "properties": props, "required": required})
}

/// Registers the browser tools.
pub(crate) fn register(registry: &mut ToolRegistry, services: &ToolServices) {
    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "browser_goto",
            "Open a URL in the workspace browser session.",
            schema(json!({"url": {"type": "string"}}), &["workspace", "url"]),
        )
        .workspace(),
        move |arguments: Value| {
            let args: GotoArgs = parse_args(arguments)?;
            let action = vec![
                format!("page.goto({}, wait_until='domcontentloaded', timeout=60000)", py_str(&args.url)),
                "print('ok')".to_string(),
                "print('title:', page.title())".to_string(),
                "print('url:', page.url)".to_string(),
            ];
            run_action(&shared, &args.workspace, &args.session, &action)
        },
    );

    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "browser_click",
            "Click an element by CSS selector in the workspace browser session.",
            schema(json!({"selector": {"type": "string"}}), &["workspace", "selector"]),
        )
        .workspace(),
        move |arguments: Value| {
            let args: ClickArgs = parse_args(arguments)?;
            let action = vec![
                format!("page.click({}, timeout=30000)", py_str(&args.selector)),
                "print('ok')".to_string(),
            ];
            run_action(&shared, &args.workspace, &args.session, &action)
        },
    );

    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "browser_type",
            "Type text into an element in the workspace browser session.",
            schema(
                json!({
                    "selector": {"type": "string"},
                    "text": {"type": "string"},
                    "clear_first": {"type": "boolean", "default": true}
                }),
                &["workspace", "selector", "text"],
            ),
        )
        .workspace(),
        move |arguments: Value| {
            let args: TypeArgs = parse_args(arguments)?;
            let selector = py_str(&args.selector);
            let mut action = Vec::new();
            if args.clear_first {
                action.push(format!("page.fill({selector}, '')"));
            }
            action.push(format!("page.type({selector}, {}, timeout=30000)", py_str(&args.text)));
            action.push("print('ok')".to_string());
            run_action(&shared, &args.workspace, &args.session, &action)
        },
    );

    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "browser_screenshot",
            "Save a full-page screenshot into the workspace.",
            schema(json!({"path": {"type": "string"}}), &["workspace", "path"]),
        )
        .workspace(),
        move |arguments: Value| {
            let args: ScreenshotArgs = parse_args(arguments)?;
            let target = shared.workspaces.resolve(&args.workspace, &args.path)?;
            let target = py_str(&target.display().to_string());
            let action = vec![
                format!("os.makedirs(os.path.dirname({target}), exist_ok=True)"),
                format!("page.screenshot(path={target}, full_page=True)"),
                "print('ok')".to_string(),
                format!("print('saved:', {target})"),
            ];
            run_action(&shared, &args.workspace, &args.session, &action)
        },
    );

    let shared = services.clone();
    registry.register(
        ToolDefinition::new(
            "browser_extract_text",
            "Extract visible text from the page or from one element.",
            schema(json!({"selector": {"type": "string"}}), &["workspace"]),
        )
        .workspace(),
        move |arguments: Value| {
            let args: ExtractArgs = parse_args(arguments)?;
            let locate = args.selector.as_deref().map_or_else(
                || "text = page.inner_text('body', timeout=30000)".to_string(),
                |selector| format!("text = page.locator({}).inner_text(timeout=30000)", py_str(selector)),
            );
            let action = vec![locate, "print('ok')".to_string(), "print(text)".to_string()];
            run_action(&shared, &args.workspace, &args.session, &action)
        },
    );
}

// ============================================================================
// SECTION: Tests
// ============================================================================
