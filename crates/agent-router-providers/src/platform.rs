// agent-router-providers/src/platform.rs
// ============================================================================
// Module: Platform Contract Source
// Description: Blocking HTTP client for the platform contract info endpoint.
// Purpose: Supply the remote contract view to the core handshake.
// Dependencies: agent-router-core, reqwest, serde_json, url
// ============================================================================

//! ## Overview
//! The platform exposes contract info as a tRPC query. Replies may be wrapped
//! in `{"result": {"data": ...}}`; the wrapper is removed before decoding.
//! Transport failures and non-JSON bodies are transient for the handshake.
//! JSON that is not a contract list is reported as a shape failure, which the
//! handshake records at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use agent_router_core::ContractSource;
use agent_router_core::ContractSourceError;
use agent_router_core::RemoteContracts;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::redirect::Policy;
use serde_json::Value;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// tRPC procedure path for contract info.
pub const TRPC_CONTRACT_PATH: &str = "api/trpc/admin.blueprintIngestion.getContractInfo";

/// Maximum accepted response body size.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// User agent for platform requests.
const USER_AGENT: &str = concat!("agent-router/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Source
// ============================================================================

/// Contract source backed by the platform HTTP API.
pub struct PlatformContractSource {
    /// Fully resolved contract info URL.
    url: Url,
    /// Optional bearer token.
    auth_token: Option<String>,
    /// HTTP client.
    client: Client,
}

impl PlatformContractSource {
    /// Creates a source for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractSourceError::Transport`] when the URL is invalid or
    /// the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ContractSourceError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|err| ContractSourceError::Transport(format!("invalid base url: {err}")))?;
        let url = base
            .join(TRPC_CONTRACT_PATH)
            .map_err(|err| ContractSourceError::Transport(format!("invalid base url: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::none())
            .build()
            .map_err(|_| ContractSourceError::Transport("http client build failed".to_string()))?;
        Ok(Self {
            url,
            auth_token: auth_token.filter(|token| !token.is_empty()),
            client,
        })
    }

    /// Returns the resolved contract info URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl ContractSource for PlatformContractSource {
    fn endpoint(&self) -> String {
        self.url.to_string()
    }

    fn fetch(&self) -> Result<RemoteContracts, ContractSourceError> {
        let mut request = self.client.get(self.url.clone());
        if let Some(token) = &self.auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let response =
            request.send().map_err(|err| ContractSourceError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContractSourceError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unexpected status").to_string(),
            });
        }
        let mut body = Vec::new();
        response
            .take(MAX_RESPONSE_BYTES)
            .read_to_end(&mut body)
            .map_err(|err| ContractSourceError::Transport(err.to_string()))?;
        decode_contracts(&body)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes a contract info body, unwrapping the tRPC `result.data` envelope.
///
/// # Errors
///
/// Returns [`ContractSourceError::Decode`] when the body is not JSON and
/// [`ContractSourceError::Shape`] when the JSON is not a contract list.
pub fn decode_contracts(body: &[u8]) -> Result<RemoteContracts, ContractSourceError> {
    let mut value: Value =
        serde_json::from_slice(body).map_err(|err| ContractSourceError::Decode(err.to_string()))?;
    if let Some(data) = value.pointer_mut("/result/data").map(Value::take) {
        value = data;
    }
    serde_json::from_value(value).map_err(|err| ContractSourceError::Shape(err.to_string()))
}
