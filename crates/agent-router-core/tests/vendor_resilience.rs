// agent-router-core/tests/vendor_resilience.rs
// ============================================================================
// Module: Vendor Resilience Tests
// Description: Tests for the per-vendor circuit breaker and rate limiter.
// ============================================================================
//! ## Overview
//! Validates breaker open/close transitions on simulated time and limiter
//! spacing on both simulated and wall-clock time.

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

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use agent_router_core::CircuitBreakerConfig;
use agent_router_core::ManualClock;
use agent_router_core::SystemClock;
use agent_router_core::VendorCircuitBreaker;
use agent_router_core::VendorRateLimiter;
use proptest::prelude::*;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Breaker with threshold 3 and a 60 second window.
fn breaker(clock: Arc<ManualClock>) -> VendorCircuitBreaker {
    VendorCircuitBreaker::new(
        CircuitBreakerConfig {
            threshold: 3,
            reset_window: Duration::from_secs(60),
        },
        clock,
    )
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Tests the breaker opens after exactly the threshold.
#[test]
fn test_breaker_opens_at_threshold() {
    let breaker = breaker(Arc::new(ManualClock::new()));
    breaker.record_failure("grainger");
    breaker.record_failure("grainger");
    assert!(!breaker.is_open("grainger"));
    breaker.record_failure("grainger");
    assert!(breaker.is_open("grainger"));
    assert!(!breaker.is_open("graybar"));
}

/// Tests the breaker closes lazily once the window has elapsed.
#[test]
fn test_breaker_resets_after_window() {
    let clock = Arc::new(ManualClock::new());
    let breaker = breaker(clock.clone());
    for _ in 0 .. 3 {
        breaker.record_failure("grainger");
    }
    clock.advance(Duration::from_secs(60));
    assert!(breaker.is_open("grainger"));
    clock.advance(Duration::from_secs(1));
    assert!(!breaker.is_open("grainger"));
    assert_eq!(breaker.failure_count("grainger"), 0);
}

/// Tests a success before the threshold clears the counter.
#[test]
fn test_breaker_success_resets_counter() {
    let breaker = breaker(Arc::new(ManualClock::new()));
    breaker.record_failure("hdsupply");
    breaker.record_failure("hdsupply");
    breaker.record_success("hdsupply");
    assert_eq!(breaker.failure_count("hdsupply"), 0);
    breaker.record_failure("hdsupply");
    breaker.record_failure("hdsupply");
    assert!(!breaker.is_open("hdsupply"));
}

/// Tests reset closes every vendor.
#[test]
fn test_breaker_reset_clears_all() {
    let breaker = breaker(Arc::new(ManualClock::new()));
    for _ in 0 .. 3 {
        breaker.record_failure("a");
        breaker.record_failure("b");
    }
    breaker.reset();
    assert!(!breaker.is_open("a"));
    assert!(!breaker.is_open("b"));
}

proptest! {
    /// The breaker is open exactly when the trailing failure run reaches the threshold.
    #[test]
    fn prop_breaker_tracks_trailing_failures(outcomes in proptest::collection::vec(any::<bool>(), 0 .. 40)) {
        let breaker = breaker(Arc::new(ManualClock::new()));
        let mut run = 0_u32;
        for success in outcomes {
            if success {
                breaker.record_success("v");
                run = 0;
            } else {
                breaker.record_failure("v");
                run += 1;
            }
            prop_assert_eq!(breaker.failure_count("v"), run);
            prop_assert_eq!(breaker.is_open("v"), run >= 3);
        }
    }
}

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Tests the interval is sixty seconds divided by the rate.
#[test]
fn test_limiter_interval_from_rpm() {
    let clock = Arc::new(ManualClock::new());
    assert_eq!(VendorRateLimiter::new(30, clock.clone()).interval(), Duration::from_secs(2));
    assert_eq!(VendorRateLimiter::new(0, clock).interval(), Duration::from_secs(60));
}

/// Tests consecutive calls for one vendor are spaced on simulated time.
#[test]
fn test_limiter_spaces_same_vendor() {
    let clock = Arc::new(ManualClock::new());
    let limiter = VendorRateLimiter::new(30, clock.clone());
    assert_eq!(limiter.wait("grainger"), Duration::ZERO);
    assert_eq!(limiter.wait("grainger"), Duration::from_secs(2));
    clock.advance(Duration::from_millis(500));
    assert_eq!(limiter.wait("grainger"), Duration::from_millis(1500));
    assert_eq!(limiter.wait("graybar"), Duration::ZERO);
    limiter.reset();
    assert_eq!(limiter.wait("grainger"), Duration::ZERO);
}

/// Tests wall-clock spacing for one vendor and no cross-vendor delay.
#[test]
fn test_limiter_wall_clock_spacing() {
    let limiter = Arc::new(VendorRateLimiter::new(6000, Arc::new(SystemClock)));
    let start = Instant::now();
    limiter.wait("a");
    limiter.wait("a");
    assert!(start.elapsed() >= Duration::from_millis(9));

    let limiter = Arc::new(VendorRateLimiter::new(60, Arc::new(SystemClock)));
    let start = Instant::now();
    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|vendor| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || limiter.wait(vendor))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Duration::ZERO);
    }
    assert!(start.elapsed() < Duration::from_millis(500));
}
