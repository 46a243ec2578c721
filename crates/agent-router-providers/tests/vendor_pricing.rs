// agent-router-providers/tests/vendor_pricing.rs
// ============================================================================
// Module: Vendor Pricing Tests
// Description: Service-level checks for search, check, sources, and batch.
// Purpose: Verify ordering, stable no-result records, retries, and breaker use.
// Dependencies: agent-router-core, agent-router-providers, tiny_http
// ============================================================================

//! ## Overview
//! Every adapter is pointed at one loopback stub. Vendors are called in
//! registration order, so scripted responses line up with adapters.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use agent_router_core::CircuitBreakerConfig;
use agent_router_core::ManualClock;
use agent_router_core::VendorCircuitBreaker;
use agent_router_core::VendorRateLimiter;
use agent_router_providers::BatchItem;
use agent_router_providers::CheckOutcome;
use agent_router_providers::REASON_ADAPTER_ERROR;
use agent_router_providers::REASON_CIRCUIT_OPEN;
use agent_router_providers::REASON_NO_MATCH;
use agent_router_providers::VendorError;
use agent_router_providers::VendorPricing;
use agent_router_providers::VendorPricingConfig;
use agent_router_providers::default_adapters;

use crate::common::StubServer;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Page with a price only.
const PRICE_ONLY: &str = r#"{"price": "9.99"}"#;
/// Page with price, SKU, and stock.
const FULL: &str = r#"{"price": "4.10", "sku": "EMT-075"} In Stock"#;
/// Page with no price.
const EMPTY: &str = "<html>no results</html>";

/// Service wiring with a manual clock.
struct Harness {
    /// Service under test.
    pricing: VendorPricing,
    /// Shared breaker.
    breaker: Arc<VendorCircuitBreaker>,
    /// Clock recording backoff sleeps.
    clock: Arc<ManualClock>,
}

/// Builds a service whose adapters all target `stub`.
fn harness(stub: &StubServer, threshold: u32, max_line_items: usize) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let adapters = default_adapters()
        .unwrap()
        .into_iter()
        .map(|adapter| {
            let template = format!("{}/{}?q={{q}}", stub.base_url, adapter.key);
            adapter.with_search_url(template)
        })
        .collect();
    let limiter = Arc::new(VendorRateLimiter::new(600, clock.clone()));
    let breaker = Arc::new(VendorCircuitBreaker::new(
        CircuitBreakerConfig {
            threshold,
            reset_window: Duration::from_secs(300),
        },
        clock.clone(),
    ));
    let config = VendorPricingConfig {
        max_retries: 1,
        request_timeout: Duration::from_secs(5),
        max_line_items,
        ..VendorPricingConfig::default()
    };
    let pricing =
        VendorPricing::new(config, adapters, limiter, Arc::clone(&breaker), clock.clone()).unwrap();
    Harness {
        pricing,
        breaker,
        clock,
    }
}

/// Scripted `200` responses.
fn pages(bodies: &[&str]) -> Vec<(u16, String)> {
    bodies.iter().map(|body| (200, (*body).to_string())).collect()
}

/// Vendor subset helper.
fn only(vendor: &str) -> Vec<String> {
    vec![vendor.to_string()]
}

// ============================================================================
// SECTION: Search
// ============================================================================

#[test]
fn search_sorts_by_confidence_and_keeps_no_match_records() {
    let stub = StubServer::start(pages(&[PRICE_ONLY, FULL, EMPTY]));
    let h = harness(&stub, 5, 50);
    let report = h.pricing.search("  3/4 emt  ", None, 10).unwrap();
    assert_eq!(report.query, "3/4 emt");
    assert_eq!(report.vendor_count, 3);
    assert_eq!(report.result_count, 3);
    let vendors: Vec<&str> = report.results.iter().map(|q| q.vendor.as_str()).collect();
    assert_eq!(vendors, vec!["graybar", "grainger", "hdsupply"]);
    assert_eq!(report.results[2].price, None);
    assert_eq!(report.results[2].reason.as_deref(), Some(REASON_NO_MATCH));
    assert!(report.errors.is_empty());
    assert!(stub.requests()[0].url.starts_with("/grainger?q=3%2F4+emt"));
}

#[test]
fn search_truncates_to_max_results() {
    let stub = StubServer::start(pages(&[PRICE_ONLY, FULL, EMPTY]));
    let h = harness(&stub, 5, 50);
    let report = h.pricing.search("emt", None, 1).unwrap();
    assert_eq!(report.result_count, 1);
    assert_eq!(report.results[0].vendor, "graybar");
    assert_eq!(report.vendor_count, 3);
}

#[test]
fn search_rejects_empty_query_and_unknown_vendor() {
    let stub = StubServer::start(pages(&[EMPTY]));
    let h = harness(&stub, 5, 50);
    assert_eq!(h.pricing.search("   ", None, 5).unwrap_err(), VendorError::EmptyQuery);
    let err = h.pricing.search("emt", Some(&only("acme")), 5).unwrap_err();
    assert!(matches!(err, VendorError::UnknownVendor { ref unknown, .. } if unknown == &only("acme")));
    assert!(stub.requests().is_empty());
}

#[test]
fn failing_vendor_is_retried_then_reported() {
    let stub = StubServer::start(vec![(500, "down".to_string())]);
    let h = harness(&stub, 5, 50);
    let report = h.pricing.search("emt", Some(&only("grainger")), 5).unwrap();
    assert_eq!(stub.requests().len(), 2);
    assert_eq!(report.results[0].reason.as_deref(), Some(REASON_ADAPTER_ERROR));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].vendor, "grainger");
    assert_eq!(h.breaker.failure_count("grainger"), 1);
    assert!(h.clock.sleeps().contains(&Duration::from_millis(500)));
}

#[test]
fn client_error_is_not_retried() {
    let stub = StubServer::start(vec![(404, String::new())]);
    let h = harness(&stub, 5, 50);
    let report = h.pricing.search("emt", Some(&only("graybar")), 5).unwrap();
    assert_eq!(stub.requests().len(), 1);
    assert_eq!(report.results[0].reason.as_deref(), Some(REASON_ADAPTER_ERROR));
}

#[test]
fn open_breaker_skips_vendor_without_request() {
    let stub = StubServer::start(pages(&[FULL]));
    let h = harness(&stub, 1, 50);
    h.breaker.record_failure("graybar");
    let report = h.pricing.search("emt", Some(&only("graybar")), 5).unwrap();
    assert!(stub.requests().is_empty());
    assert_eq!(report.skipped, only("graybar"));
    assert_eq!(report.results[0].reason.as_deref(), Some(REASON_CIRCUIT_OPEN));
}

#[test]
fn success_clears_failure_count() {
    let stub = StubServer::start(pages(&[FULL]));
    let h = harness(&stub, 5, 50);
    h.breaker.record_failure("graybar");
    h.pricing.search("emt", Some(&only("graybar")), 5).unwrap();
    assert_eq!(h.breaker.failure_count("graybar"), 0);
}

// ============================================================================
// SECTION: Check and Sources
// ============================================================================

#[test]
fn check_returns_quote_or_circuit_open() {
    let stub = StubServer::start(pages(&[FULL]));
    let h = harness(&stub, 1, 50);
    match h.pricing.check("graybar", "EMT-075").unwrap() {
        CheckOutcome::Quote(quote) => assert_eq!(quote.sku, "EMT-075"),
        CheckOutcome::CircuitOpen { .. } => panic!("breaker should be closed"),
    }
    h.breaker.record_failure("graybar");
    let outcome = h.pricing.check("graybar", "EMT-075").unwrap();
    assert_eq!(outcome, CheckOutcome::CircuitOpen {
        vendor: "graybar".to_string()
    });
    assert_eq!(h.pricing.check("graybar", " ").unwrap_err(), VendorError::EmptySku);
    assert!(matches!(h.pricing.check("acme", "x"), Err(VendorError::UnknownVendor { .. })));
}

#[test]
fn list_sources_reports_breaker_state() {
    let stub = StubServer::start(pages(&[EMPTY]));
    let h = harness(&stub, 1, 50);
    h.breaker.record_failure("hdsupply");
    let sources = h.pricing.list_sources();
    assert_eq!(sources.vendor_count, 3);
    assert_eq!(sources.max_retries, 1);
    let hd = sources.vendors.iter().find(|v| v.vendor == "hdsupply").unwrap();
    assert_eq!(hd.status, "circuit_open");
    let grainger = sources.vendors.iter().find(|v| v.vendor == "grainger").unwrap();
    assert_eq!(grainger.status, "configured");
}

// ============================================================================
// SECTION: Batch
// ============================================================================

#[test]
fn batch_over_limit_is_rejected_before_any_request() {
    let stub = StubServer::start(pages(&[FULL]));
    let h = harness(&stub, 5, 2);
    let items: Vec<BatchItem> = (0 .. 3)
        .map(|i| BatchItem {
            query: format!("item {i}"),
            vendors: None,
            quantity: None,
        })
        .collect();
    assert_eq!(h.pricing.batch(&items, 3).unwrap_err(), VendorError::TooManyLineItems {
        count: 3,
        max: 2
    });
    assert_eq!(h.pricing.batch(&[], 3).unwrap_err(), VendorError::EmptyBatch);
    assert!(stub.requests().is_empty());
}

#[test]
fn batch_extends_prices_and_reports_line_errors() {
    let stub = StubServer::start(pages(&[FULL]));
    let h = harness(&stub, 5, 50);
    let items = vec![
        BatchItem {
            query: "emt".to_string(),
            vendors: Some(only("graybar")),
            quantity: Some(10.0),
        },
        BatchItem {
            query: String::new(),
            vendors: None,
            quantity: Some(1.0),
        },
    ];
    let report = h.pricing.batch(&items, 3).unwrap();
    assert_eq!(report.item_count, 2);
    assert_eq!(report.priced_count, 1);
    assert!((report.estimated_total - 41.0).abs() < f64::EPSILON);
    assert_eq!(report.items[0].extended_price, Some(41.0));
    assert!(report.items[1].error.is_some());
    assert_eq!(report.items[1].best.price, None);
}
