// agent-router-core/src/lib.rs
// ============================================================================
// Module: Agent Router Core Library
// Description: Public API surface for the agent router governance core.
// Purpose: Expose manifest, handshake, and vendor resilience primitives.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! Agent router core holds the state that every tool call depends on: the
//! immutable freeze manifest, the contract handshake verdict, and the
//! per-vendor rate limiter and circuit breaker. It performs no network I/O
//! and no async work; remote collaborators plug in through
//! [`ContractSource`] and time is injected through [`Clock`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use runtime::CircuitBreakerConfig;
pub use runtime::ContractHandshake;
pub use runtime::ContractSource;
pub use runtime::ContractSourceError;
pub use runtime::HandshakeConfig;
pub use runtime::HandshakeStatus;
pub use runtime::RemoteContract;
pub use runtime::RemoteContracts;
pub use runtime::VendorCircuitBreaker;
pub use runtime::VendorRateLimiter;
pub use runtime::compare_contracts;
