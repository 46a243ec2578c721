// agent-router-core/src/runtime/mod.rs
// ============================================================================
// Module: Agent Router Runtime
// Description: Mutable process-wide state with explicit constructors.
// Purpose: Host the handshake verdict and per-vendor resilience maps.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Runtime components hold shared mutable state behind mutexes. Each is an
//! ordinary value built by the entry point and shared through `Arc`, with a
//! `reset()` for tests that need a clean slate.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod circuit_breaker;
pub mod handshake;
pub mod rate_limit;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use circuit_breaker::CircuitBreakerConfig;
pub use circuit_breaker::VendorCircuitBreaker;
pub use handshake::ContractHandshake;
pub use handshake::ContractSource;
pub use handshake::ContractSourceError;
pub use handshake::HandshakeConfig;
pub use handshake::HandshakeStatus;
pub use handshake::RemoteContract;
pub use handshake::RemoteContracts;
pub use handshake::compare_contracts;
pub use rate_limit::VendorRateLimiter;
