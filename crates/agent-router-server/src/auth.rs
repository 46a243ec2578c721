// agent-router-server/src/auth.rs
// ============================================================================
// Module: Router Auth
// Description: Shared-secret header check for tool calls.
// Purpose: Reject unauthenticated callers before dispatch.
// Dependencies: subtle
// ============================================================================

//! ## Overview
//! When a router token is configured, every tool call must carry it in the
//! `x-router-token` header. Comparison is constant-time. An unset or empty
//! token disables the check.

use subtle::ConstantTimeEq;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Header carrying the shared secret.
pub const ROUTER_TOKEN_HEADER: &str = "x-router-token";

// ============================================================================
// SECTION: Checks
// ============================================================================

/// Compares two strings in constant time.
#[must_use]
pub fn constant_time_eq_str(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Returns true when `presented` satisfies the configured token.
#[must_use]
pub fn is_authorized(expected: Option<&str>, presented: Option<&str>) -> bool {
    match expected.filter(|token| !token.is_empty()) {
        None => true,
        Some(expected) => presented.is_some_and(|value| constant_time_eq_str(expected, value)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
