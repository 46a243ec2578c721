// agent-router-providers/src/lib.rs
// ============================================================================
// Module: Agent Router Providers
// Description: Network collaborators for the agent router.
// Purpose: Fetch platform contracts and vendor pricing over blocking HTTP.
// Dependencies: agent-router-core, reqwest, regex, url
// ============================================================================

//! ## Overview
//! This crate holds every outbound HTTP integration. The platform contract
//! source plugs into the core handshake; the vendor pricing service consumes
//! the core rate limiter and circuit breaker. All clients are blocking,
//! bounded by timeouts, and never follow redirects.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod adapters;
pub mod platform;
pub mod vendor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use adapters::ParseProfile;
pub use adapters::VendorAdapter;
pub use adapters::default_adapters;
pub use platform::PlatformContractSource;
pub use platform::TRPC_CONTRACT_PATH;
pub use platform::decode_contracts;
pub use vendor::BatchItem;
pub use vendor::BatchLine;
pub use vendor::BatchReport;
pub use vendor::CheckOutcome;
pub use vendor::REASON_ADAPTER_ERROR;
pub use vendor::REASON_CIRCUIT_OPEN;
pub use vendor::REASON_NO_MATCH;
pub use vendor::SearchReport;
pub use vendor::SourceInfo;
pub use vendor::SourcesReport;
pub use vendor::VendorFailure;
pub use vendor::VendorError;
pub use vendor::VendorPricing;
pub use vendor::VendorPricingConfig;
pub use vendor::VendorQuote;
