// agent-router-providers/tests/common/mod.rs
// ============================================================================
// Module: Common Provider Test Helpers
// Description: Local HTTP stub that replays scripted responses.
// Purpose: Exercise blocking clients without external network access.
// Dependencies: tiny_http
// ============================================================================

//! ## Overview
//! [`StubServer`] binds an ephemeral loopback port, answers each request with
//! the next scripted response (the last one repeats), and records the path and
//! `Authorization` header of every request it sees.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Stub Server
// ============================================================================

/// Request observed by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Path and query.
    pub url: String,
    /// `Authorization` header, if sent.
    pub authorization: Option<String>,
}

/// Loopback HTTP stub.
pub struct StubServer {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Requests in arrival order.
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Starts a stub answering with `(status, body)` pairs in order.
    pub fn start(responses: Vec<(u16, String)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            let mut index = 0_usize;
            while let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(5)) {
                let authorization = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("Authorization"))
                    .map(|header| header.value.as_str().to_string());
                recorded.lock().unwrap().push(RecordedRequest {
                    url: request.url().to_string(),
                    authorization,
                });
                let (status, body) = responses[index.min(responses.len() - 1)].clone();
                index += 1;
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
        }
    }

    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}
