// agent-router-config/src/config.rs
// ============================================================================
// Module: Agent Router Configuration
// Description: Configuration loading, environment overrides, and validation.
// Purpose: Provide strict, fail-closed config parsing with documented defaults.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration starts from built-in defaults, optionally layers a TOML file
//! named by `--config` or `AGENT_ROUTER_CONFIG`, then applies environment
//! variable overrides. Unparseable values and out-of-range settings fail
//! closed with [`ConfigError::Invalid`] naming the offending key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming an optional TOML config file.
pub const CONFIG_ENV_VAR: &str = "AGENT_ROUTER_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Upper bound for vendor retry attempts.
const MAX_VENDOR_RETRIES: u32 = 10;
/// Default HTTP bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default maximum request body size.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default outbound vendor user agent.
const DEFAULT_VENDOR_USER_AGENT: &str = "AgentRouter-PricingBot/1.0";
/// Default active detection model.
const DEFAULT_ACTIVE_MODEL: &str = "yolov8n-blueprint-v1";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Router Config
// ============================================================================

/// Complete router configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterConfig {
    /// HTTP transport settings.
    pub server: ServerConfig,
    /// Freeze manifest location.
    pub manifest: ManifestConfig,
    /// Contract handshake settings.
    pub handshake: HandshakeSettings,
    /// Audit log settings.
    pub audit: AuditConfig,
    /// Workspace and container settings.
    pub workspace: WorkspaceConfig,
    /// Vendor pricing settings.
    pub vendor: VendorConfig,
    /// GitHub pull request settings.
    pub github: GithubConfig,
    /// Blueprint detection settings.
    pub blueprint: BlueprintConfig,
}

impl RouterConfig {
    /// Loads configuration from the process environment.
    ///
    /// A TOML file is layered first when `path` is given or
    /// `AGENT_ROUTER_CONFIG` is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match resolve_path(path)? {
            Some(resolved) => Self::from_file(&resolved)?,
            None => Self::default(),
        };
        config.apply_env(&|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Builds configuration from defaults plus a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an override is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_env(&lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML config file without applying overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies environment variable overrides.
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unparseable variable.
    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let env = EnvReader { lookup };

        if let Some(bind) = env.string("ROUTER_BIND") {
            self.server.bind = bind;
        }
        if let Some(token) = env.string("ROUTER_AUTH_TOKEN") {
            self.server.auth_token = Some(token);
        }
        env.parse_into("ROUTER_MAX_BODY_BYTES", &mut self.server.max_body_bytes)?;

        if let Some(path) = env.string("FREEZE_MANIFEST_PATH") {
            self.manifest.path = Some(PathBuf::from(path));
        }
        if let Some(dir) = env.string("CONTRACT_SCHEMA_DIR") {
            self.manifest.schema_dir = Some(PathBuf::from(dir));
        }

        if let Some(url) = env.string("PLATFORM_BASE_URL") {
            self.handshake.platform_base_url = Some(url);
        }
        if let Some(token) = env.string("PLATFORM_AUTH_TOKEN") {
            self.handshake.platform_auth_token = Some(token);
        }
        env.parse_into("CONTRACT_HANDSHAKE_TIMEOUT", &mut self.handshake.timeout_secs)?;
        env.parse_into("CONTRACT_HANDSHAKE_RETRIES", &mut self.handshake.retries)?;
        env.parse_into("CONTRACT_HANDSHAKE_BACKOFF_MS", &mut self.handshake.backoff_ms)?;
        env.bool_into("CONTRACT_HANDSHAKE_FAIL_EXIT", &mut self.handshake.fail_exit)?;
        env.parse_into("CONTRACT_HANDSHAKE_CACHE_TTL", &mut self.handshake.cache_ttl_secs)?;
        env.parse_into("CONTRACT_HANDSHAKE_RECHECK", &mut self.handshake.recheck)?;

        if let Some(dir) = env.string("AUDIT_LOG_DIR") {
            self.audit.log_dir = PathBuf::from(dir);
        }

        if let Some(root) = env.string("WORKSPACE_ROOT") {
            self.workspace.root = PathBuf::from(root);
        }
        if let Some(container) = env.string("SANDBOX_RUNNER_CONTAINER") {
            self.workspace.sandbox_container = container;
        }
        if let Some(container) = env.string("BROWSER_CONTAINER") {
            self.workspace.browser_container = container;
        }
        env.parse_into("SANDBOX_TIMEOUT_SEC", &mut self.workspace.sandbox_timeout_secs)?;

        env.parse_into("VENDOR_RATE_LIMIT_RPM", &mut self.vendor.rate_limit_rpm)?;
        env.parse_into("VENDOR_CIRCUIT_BREAKER_THRESHOLD", &mut self.vendor.breaker_threshold)?;
        env.parse_into("VENDOR_CIRCUIT_BREAKER_RESET_SEC", &mut self.vendor.breaker_reset_secs)?;
        env.parse_into("VENDOR_REQUEST_TIMEOUT", &mut self.vendor.request_timeout_secs)?;
        env.parse_into("VENDOR_MAX_RETRIES", &mut self.vendor.max_retries)?;
        if let Some(agent) = env.string("VENDOR_USER_AGENT") {
            self.vendor.user_agent = agent;
        }
        env.parse_into("VENDOR_MAX_LINE_ITEMS", &mut self.vendor.max_line_items)?;

        if let Some(owner) = env.string("GITHUB_OWNER") {
            self.github.owner = Some(owner);
        }
        if let Some(repo) = env.string("GITHUB_REPO") {
            self.github.repo = Some(repo);
        }
        if let Some(token) = env.string("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(branch) = env.string("GITHUB_DEFAULT_BRANCH") {
            self.github.default_branch = branch;
        }
        if let Some(url) = env.string("GITHUB_API_URL") {
            self.github.api_url = url;
        }

        if let Some(model) = env.string("BLUEPRINT_ACTIVE_MODEL") {
            self.blueprint.active_model = model;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.manifest.validate()?;
        self.handshake.validate()?;
        self.audit.validate()?;
        self.workspace.validate()?;
        self.vendor.validate()?;
        self.github.validate()?;
        self.blueprint.validate()
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// Shared secret for the `x-router-token` header; `None` disables auth.
    pub auth_token: Option<String>,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            auth_token: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Returns the parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("server.bind is not a socket address: {}", self.bind)))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_body_bytes must be > 0".to_string()));
        }
        if self.auth_token.as_deref().is_some_and(|token| token.trim().is_empty()) {
            return Err(ConfigError::Invalid("server.auth_token must be non-empty".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Freeze manifest location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    /// Manifest file; `None` selects the bundled manifest.
    pub path: Option<PathBuf>,
    /// Directory holding `<Contract>.schema.json` files for locked contracts.
    pub schema_dir: Option<PathBuf>,
}

impl ManifestConfig {
    /// Validates manifest configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("manifest.path", &path.to_string_lossy())?;
        }
        match &self.schema_dir {
            Some(dir) => validate_path_string("manifest.schema_dir", &dir.to_string_lossy()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SECTION: Handshake
// ============================================================================

/// When a stale handshake verdict is re-checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecheckPolicy {
    /// Run once at startup only.
    #[default]
    Startup,
    /// Re-run lazily when a frozen tool is called with a stale verdict.
    OnFrozenCall,
}

impl FromStr for RecheckPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "startup" => Ok(Self::Startup),
            "on_frozen_call" => Ok(Self::OnFrozenCall),
            other => Err(format!("expected startup or on_frozen_call, got {other}")),
        }
    }
}

/// Contract handshake configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HandshakeSettings {
    /// Platform base URL; `None` makes the handshake fail without a fetch.
    pub platform_base_url: Option<String>,
    /// Bearer token for the platform call.
    pub platform_auth_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum fetch attempts.
    pub retries: u32,
    /// Base backoff in milliseconds.
    pub backoff_ms: u64,
    /// Exit with status 78 when the startup handshake fails.
    pub fail_exit: bool,
    /// Seconds before a verdict is stale.
    pub cache_ttl_secs: u64,
    /// Stale verdict recheck policy.
    pub recheck: RecheckPolicy,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            platform_base_url: None,
            platform_auth_token: None,
            timeout_secs: 10,
            retries: 3,
            backoff_ms: 2_000,
            fail_exit: false,
            cache_ttl_secs: 3_600,
            recheck: RecheckPolicy::Startup,
        }
    }
}

impl HandshakeSettings {
    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the base backoff.
    #[must_use]
    pub const fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Returns the verdict TTL.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Validates handshake configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::Invalid("handshake.retries must be >= 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("handshake.timeout_secs must be > 0".to_string()));
        }
        if let Some(url) = &self.platform_base_url {
            validate_http_url("handshake.platform_base_url", url)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit log configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Directory that holds `estimate_runs.jsonl`.
    pub log_dir: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/logs"),
        }
    }
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("audit.log_dir", &self.log_dir.to_string_lossy())
    }
}

// ============================================================================
// SECTION: Workspace
// ============================================================================

/// Workspace registry and container configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Directory whose non-hidden subdirectories are workspaces.
    pub root: PathBuf,
    /// Container that runs sandbox commands.
    pub sandbox_container: String,
    /// Container that runs browser scripts.
    pub browser_container: String,
    /// Default sandbox command timeout in seconds.
    pub sandbox_timeout_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/workspaces"),
            sandbox_container: "agent-runner".to_string(),
            browser_container: "agent-browser".to_string(),
            sandbox_timeout_secs: 120,
        }
    }
}

impl WorkspaceConfig {
    /// Returns the default sandbox command timeout.
    #[must_use]
    pub const fn sandbox_timeout(&self) -> Duration {
        Duration::from_secs(self.sandbox_timeout_secs)
    }

    /// Validates workspace configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("workspace.root", &self.root.to_string_lossy())?;
        require_non_empty("workspace.sandbox_container", &self.sandbox_container)?;
        require_non_empty("workspace.browser_container", &self.browser_container)?;
        if self.sandbox_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "workspace.sandbox_timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Vendor
// ============================================================================

/// Vendor pricing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VendorConfig {
    /// Requests per minute per vendor.
    pub rate_limit_rpm: u32,
    /// Consecutive failures that open a vendor breaker.
    pub breaker_threshold: u32,
    /// Seconds an open breaker stays open.
    pub breaker_reset_secs: u64,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Extra attempts on 429 and 5xx replies.
    pub max_retries: u32,
    /// Outbound user agent.
    pub user_agent: String,
    /// Maximum line items in one batch lookup.
    pub max_line_items: usize,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            rate_limit_rpm: 30,
            breaker_threshold: 5,
            breaker_reset_secs: 300,
            request_timeout_secs: 15,
            max_retries: 3,
            user_agent: DEFAULT_VENDOR_USER_AGENT.to_string(),
            max_line_items: 50,
        }
    }
}

impl VendorConfig {
    /// Returns the breaker reset window.
    #[must_use]
    pub const fn breaker_reset(&self) -> Duration {
        Duration::from_secs(self.breaker_reset_secs)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validates vendor configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit_rpm == 0 {
            return Err(ConfigError::Invalid("vendor.rate_limit_rpm must be >= 1".to_string()));
        }
        if self.breaker_threshold == 0 {
            return Err(ConfigError::Invalid("vendor.breaker_threshold must be >= 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "vendor.request_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.max_retries > MAX_VENDOR_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "vendor.max_retries must be <= {MAX_VENDOR_RETRIES}"
            )));
        }
        if self.max_line_items == 0 {
            return Err(ConfigError::Invalid("vendor.max_line_items must be >= 1".to_string()));
        }
        require_non_empty("vendor.user_agent", &self.user_agent)
    }
}

// ============================================================================
// SECTION: GitHub
// ============================================================================

/// GitHub pull request configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GithubConfig {
    /// Repository owner.
    pub owner: Option<String>,
    /// Repository name.
    pub repo: Option<String>,
    /// API token.
    pub token: Option<String>,
    /// Base branch for pull requests.
    pub default_branch: String,
    /// REST API base URL.
    pub api_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            token: None,
            default_branch: "main".to_string(),
            api_url: "https://api.github.com".to_string(),
        }
    }
}

impl GithubConfig {
    /// Returns true when owner, repo, and token are all set.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.owner.is_some() && self.repo.is_some() && self.token.is_some()
    }

    /// Validates GitHub configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("github.default_branch", &self.default_branch)?;
        validate_http_url("github.api_url", &self.api_url)
    }
}

// ============================================================================
// SECTION: Blueprint
// ============================================================================

/// Blueprint detection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlueprintConfig {
    /// Active detection model id.
    pub active_model: String,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            active_model: DEFAULT_ACTIVE_MODEL.to_string(),
        }
    }
}

impl BlueprintConfig {
    /// Validates blueprint configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty("blueprint.active_model", &self.active_model)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Environment lookup with typed accessors.
struct EnvReader<'a> {
    /// Variable lookup.
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    /// Returns the trimmed value, or `None` when unset or empty.
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    /// Parses a value into `target` when the variable is set.
    fn parse_into<T>(&self, key: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        if let Some(raw) = self.string(key) {
            *target = raw
                .parse()
                .map_err(|err| ConfigError::Invalid(format!("{key}={raw}: {err}")))?;
        }
        Ok(())
    }

    /// Parses a boolean flag into `target` when the variable is set.
    fn bool_into(&self, key: &str, target: &mut bool) -> Result<(), ConfigError> {
        if let Some(raw) = self.string(key) {
            *target = match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::Invalid(format!("{key}={raw}: expected a boolean")));
                }
            };
        }
        Ok(())
    }
}

/// Resolves the config path from the argument or environment.
fn resolve_path(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    match env::var(CONFIG_ENV_VAR) {
        Ok(env_path) if !env_path.trim().is_empty() => {
            if env_path.len() > MAX_TOTAL_PATH_LENGTH {
                return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
            }
            Ok(Some(PathBuf::from(env_path)))
        }
        _ => Ok(None),
    }
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Requires an http or https URL.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.starts_with("https://") || trimmed.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must include http:// or https://")))
    }
}

/// Requires a non-blank string.
fn require_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Invalid(format!("{field} must be non-empty")))
    } else {
        Ok(())
    }
}
