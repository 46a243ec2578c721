// agent-router-server/src/server.rs
// ============================================================================
// Module: Router Server
// Description: HTTP transport for the tool router.
// Purpose: Expose dispatch, health, contract status, and the tool list.
// Dependencies: agent-router-config, agent-router-core, agent-router-providers, axum, tokio
// ============================================================================

//! ## Overview
//! [`RouterServer::from_config`] wires every collaborator from a validated
//! [`RouterConfig`]. [`RouterServer::serve`] runs the contract handshake once
//! before binding, then serves:
//!
//! - `POST /tool`: dispatch one tool call.
//! - `GET /health`: liveness plus handshake status.
//! - `GET /contracts/status`: handshake status.
//! - `GET /contracts/integrity`: drift of frozen schema files against their
//!   startup digests.
//! - `GET /tools`: function-call schemas for every registered tool.
//!
//! Only `POST /tool` checks the `x-router-token` header; the GET routes stay
//! open for liveness checks and discovery.
//!
//! Business failures are returned with status 200. Only the two dispatch
//! gates escalate: 503 for a frozen tool without a valid handshake and 422
//! for an unknown workspace.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use agent_router_config::RouterConfig;
use agent_router_core::CircuitBreakerConfig;
use agent_router_core::Clock;
use agent_router_core::ContractHandshake;
use agent_router_core::ContractSource;
use agent_router_core::FreezeManifestStore;
use agent_router_core::HandshakeConfig;
use agent_router_core::SchemaIntegrity;
use agent_router_core::SystemClock;
use agent_router_core::VendorCircuitBreaker;
use agent_router_core::VendorRateLimiter;
use agent_router_providers::PlatformContractSource;
use agent_router_providers::VendorPricing;
use agent_router_providers::VendorPricingConfig;
use agent_router_providers::default_adapters;
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::audit::AuditSink;
use crate::audit::FileAuditSink;
use crate::auth::ROUTER_TOKEN_HEADER;
use crate::auth::is_authorized;
use crate::handlers::ApprovalStore;
use crate::handlers::ProcessRunner;
use crate::handlers::ToolServices;
use crate::handlers::ToolSettings;
use crate::handlers::builtin_registry;
use crate::tools::DispatchError;
use crate::tools::ToolRouter;
use crate::tools::ToolRouterConfig;
use crate::workspace::WorkspaceRegistry;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// 400 message for a body matching neither accepted shape.
pub const BAD_SHAPE_DETAIL: &str =
    "Provide either {tool_call: {name, arguments}} or {name, arguments}";

// ============================================================================
// SECTION: Router Server
// ============================================================================

/// Router server instance.
pub struct RouterServer {
    /// Validated configuration.
    config: RouterConfig,
    /// Tool dispatcher.
    router: ToolRouter,
}

impl RouterServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or initialization fails.
    pub fn from_config(config: RouterConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let router = build_tool_router(&config)?;
        Ok(Self {
            config,
            router,
        })
    }

    /// Returns the tool dispatcher.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.router
    }

    /// Runs the handshake, then serves HTTP until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::HandshakeRequired`] when the handshake fails and
    /// `fail_exit` is set, and [`ServerError::Transport`] for listener failures.
    pub async fn serve(self) -> Result<(), ServerError> {
        let handshake = Arc::clone(self.router.handshake());
        let passed = tokio::task::spawn_blocking(move || handshake.run())
            .await
            .map_err(|err| ServerError::Init(format!("handshake task failed: {err}")))?;
        if !passed {
            let errors = self.router.handshake().errors();
            if self.config.handshake.fail_exit {
                return Err(ServerError::HandshakeRequired {
                    errors,
                });
            }
            warn!(
                errors = %errors.join("; "),
                "contract handshake failed; frozen tools are disabled"
            );
        }
        let addr = self.config.server.socket_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let state = AppState::new(
            self.router,
            self.config.server.auth_token.clone(),
            self.config.server.max_body_bytes,
        );
        serve_http(addr, state).await
    }
}

/// Builds the tool dispatcher and every collaborator from configuration.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the manifest, platform client, vendor
/// adapters, or a handler client cannot be built.
pub fn build_tool_router(config: &RouterConfig) -> Result<ToolRouter, ServerError> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let manifest = match &config.manifest.path {
        Some(path) => FreezeManifestStore::open(path),
        None => FreezeManifestStore::bundled(),
    }
    .map_err(|err| ServerError::Init(err.to_string()))?;
    let manifest = Arc::new(manifest);

    let source: Option<Arc<dyn ContractSource>> = match &config.handshake.platform_base_url {
        Some(base_url) => Some(Arc::new(
            PlatformContractSource::new(
                base_url,
                config.handshake.platform_auth_token.clone(),
                config.handshake.timeout(),
            )
            .map_err(|err| ServerError::Init(err.to_string()))?,
        )),
        None => None,
    };
    let handshake = Arc::new(ContractHandshake::new(
        Arc::clone(&manifest),
        source,
        HandshakeConfig {
            max_attempts: config.handshake.retries,
            backoff_base: config.handshake.backoff_base(),
            cache_ttl: config.handshake.cache_ttl(),
        },
        Arc::clone(&clock),
    ));

    let limiter = Arc::new(VendorRateLimiter::new(config.vendor.rate_limit_rpm, Arc::clone(&clock)));
    let breaker = Arc::new(VendorCircuitBreaker::new(
        CircuitBreakerConfig {
            threshold: config.vendor.breaker_threshold,
            reset_window: config.vendor.breaker_reset(),
        },
        Arc::clone(&clock),
    ));
    let adapters = default_adapters().map_err(|err| ServerError::Init(err.to_string()))?;
    let pricing = VendorPricing::new(
        VendorPricingConfig {
            rate_limit_rpm: config.vendor.rate_limit_rpm,
            request_timeout: config.vendor.request_timeout(),
            max_retries: config.vendor.max_retries,
            user_agent: config.vendor.user_agent.clone(),
            max_line_items: config.vendor.max_line_items,
            ..VendorPricingConfig::default()
        },
        adapters,
        limiter,
        breaker,
        clock,
    )
    .map_err(|err| ServerError::Init(err.to_string()))?;

    let audit: Arc<dyn AuditSink> = Arc::new(FileAuditSink::new(config.audit.log_dir.clone()));
    let workspaces = Arc::new(WorkspaceRegistry::new(config.workspace.root.clone()));
    let services = ToolServices {
        workspaces: Arc::clone(&workspaces),
        runner: Arc::new(ProcessRunner),
        pricing: Arc::new(pricing),
        manifest: Arc::clone(&manifest),
        audit: Arc::clone(&audit),
        approvals: Arc::new(ApprovalStore::new()),
        settings: ToolSettings {
            sandbox_container: config.workspace.sandbox_container.clone(),
            browser_container: config.workspace.browser_container.clone(),
            sandbox_timeout: config.workspace.sandbox_timeout(),
            github: config.github.clone(),
            active_model: config.blueprint.active_model.clone(),
        },
    };
    let registry = builtin_registry(&services).map_err(|err| ServerError::Init(err.to_string()))?;
    let schemas = Arc::new(SchemaIntegrity::new());
    if let Some(dir) = &config.manifest.schema_dir {
        register_frozen_schemas(&manifest, dir, &schemas);
    }
    info!(
        tools = registry.len(),
        frozen = manifest.is_frozen(),
        manifest_hash = %manifest.manifest_hash(),
        "tool router initialized"
    );
    Ok(ToolRouter::new(ToolRouterConfig {
        registry,
        manifest,
        handshake,
        workspaces,
        audit,
        schemas,
        recheck: config.handshake.recheck,
    }))
}

/// Records the current digest of `<dir>/<Contract>.schema.json` for every
/// locked contract that has a file there.
///
/// A digest that disagrees with the manifest's `schema_hash` is logged but
/// still becomes the baseline; drift is measured from startup onward.
pub fn register_frozen_schemas(manifest: &FreezeManifestStore, dir: &Path, schemas: &SchemaIntegrity) {
    for contract in manifest.locked_contracts() {
        let path = dir.join(format!("{contract}.schema.json"));
        if !path.is_file() {
            continue;
        }
        match schemas.register_current(&contract, &path) {
            Ok(hash) => {
                let declared = manifest
                    .manifest()
                    .contracts
                    .iter()
                    .find(|entry| entry.name == contract)
                    .and_then(|entry| entry.schema_hash.as_deref());
                if declared.is_some_and(|declared| !declared.eq_ignore_ascii_case(&hash)) {
                    warn!(contract = %contract, declared = ?declared, actual = %hash, "schema file differs from manifest hash");
                }
            }
            Err(err) => warn!(contract = %contract, error = %err, "could not register frozen schema hash"),
        }
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Tool dispatcher.
    router: ToolRouter,
    /// Expected `x-router-token` value.
    auth_token: Option<String>,
    /// Maximum request body size.
    max_body_bytes: usize,
}

impl AppState {
    /// Creates transport state.
    #[must_use]
    pub const fn new(router: ToolRouter, auth_token: Option<String>, max_body_bytes: usize) -> Self {
        Self {
            router,
            auth_token,
            max_body_bytes,
        }
    }

    /// Returns true when the request headers carry the expected token.
    fn authorized(&self, headers: &HeaderMap) -> bool {
        let presented = headers.get(ROUTER_TOKEN_HEADER).and_then(|value| value.to_str().ok());
        is_authorized(self.auth_token.as_deref(), presented)
    }
}

/// Builds the axum application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/tool", post(handle_tool))
        .route("/health", get(handle_health))
        .route("/contracts/status", get(handle_contract_status))
        .route("/contracts/integrity", get(handle_schema_integrity))
        .route("/tools", get(handle_tools))
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves the application.
async fn serve_http(addr: SocketAddr, state: AppState) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
    info!(%addr, "agent router listening");
    axum::serve(listener, app(state))
        .await
        .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
}

/// Handles `POST /tool`.
async fn handle_tool(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let (status, body) = handle_tool_request(&state, &headers, &bytes);
    (status, Json(body))
}

/// Handles `GET /health`.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.router.handshake().status();
    (StatusCode::OK, Json(json!({"ok": true, "contract_handshake": status})))
}

/// Handles `GET /contracts/status`.
async fn handle_contract_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!(state.router.handshake().status())))
}

/// Handles `GET /contracts/integrity`.
async fn handle_schema_integrity(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let schemas = state.router.schema_integrity();
    let violations = schemas.verify_schema_integrity();
    (
        StatusCode::OK,
        Json(json!({
            "ok": violations.is_empty(),
            "checked": schemas.registered(),
            "violations": violations,
        })),
    )
}

/// Handles `GET /tools`.
async fn handle_tools(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"tools": state.router.list_tools()})))
}

// ============================================================================
// SECTION: Request Handling
// ============================================================================

/// Tool name plus arguments.
#[derive(Debug, Deserialize)]
struct ToolCallBody {
    /// Tool name.
    name: String,
    /// Arguments object; required in both shapes.
    arguments: Map<String, Value>,
}

/// Accepted request shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ToolRequest {
    /// `{tool_call: {name, arguments}}`.
    Wrapped {
        /// Wrapped call.
        tool_call: ToolCallBody,
    },
    /// `{name, arguments}`.
    Flat(ToolCallBody),
}

impl ToolRequest {
    /// Unwraps either shape.
    fn into_call(self) -> ToolCallBody {
        match self {
            Self::Wrapped {
                tool_call,
            } => tool_call,
            Self::Flat(call) => call,
        }
    }
}

/// Authorizes, parses, and dispatches one `POST /tool` request.
#[must_use]
pub fn handle_tool_request(state: &AppState, headers: &HeaderMap, bytes: &[u8]) -> (StatusCode, Value) {
    if !state.authorized(headers) {
        return (StatusCode::UNAUTHORIZED, json!({"detail": "Unauthorized"}));
    }
    if bytes.len() > state.max_body_bytes {
        return (StatusCode::PAYLOAD_TOO_LARGE, json!({"detail": "Request body too large"}));
    }
    let body: Value = match serde_json::from_slice(bytes) {
        Ok(body) => body,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, json!({"detail": format!("Invalid JSON: {err}")}));
        }
    };
    let Ok(request) = serde_json::from_value::<ToolRequest>(body) else {
        return (StatusCode::BAD_REQUEST, json!({"detail": BAD_SHAPE_DETAIL}));
    };
    let call = request.into_call();
    let arguments = Value::Object(call.arguments);
    match dispatch_with_blocking(&state.router, &call.name, arguments) {
        Ok(response) => (StatusCode::OK, response),
        Err(err) => {
            let status = match err {
                DispatchError::ContractMismatch {
                    ..
                } => StatusCode::SERVICE_UNAVAILABLE,
                DispatchError::WorkspaceNotFound {
                    ..
                } => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, json!({"detail": err.detail()}))
        }
    }
}

/// Dispatches a call, shifting to a blocking context when available.
fn dispatch_with_blocking(
    router: &ToolRouter,
    name: &str,
    arguments: Value,
) -> Result<Value, DispatchError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| router.dispatch(name, arguments))
        }
        _ => router.dispatch(name, arguments),
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Router server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
    /// Handshake failed while startup requires it.
    #[error("contract handshake failed: {}", errors.join("; "))]
    HandshakeRequired {
        /// Handshake errors.
        errors: Vec<String>,
    },
}
