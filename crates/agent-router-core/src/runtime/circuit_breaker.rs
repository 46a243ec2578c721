// agent-router-core/src/runtime/circuit_breaker.rs
// ============================================================================
// Module: Agent Router Vendor Circuit Breaker
// Description: Consecutive-failure breaker keyed by vendor.
// Purpose: Skip vendors that keep failing until a cooldown elapses.
// Dependencies: crate::core::Clock
// ============================================================================

//! ## Overview
//! A vendor opens after `threshold` consecutive failures. There is no
//! background timer and no half-open trial call: the first [`VendorCircuitBreaker::is_open`]
//! query after the reset window clears the bucket and lets full traffic
//! through again. Any success clears the bucket entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use crate::core::Clock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub threshold: u32,
    /// Time an open breaker stays open.
    pub reset_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 5,
            reset_window: Duration::from_secs(300),
        }
    }
}

/// Per-vendor breaker state.
#[derive(Debug, Default, Clone, Copy)]
struct BreakerBucket {
    /// Consecutive failures.
    failure_count: u32,
    /// When the threshold was reached.
    opened_at: Option<Instant>,
}

// ============================================================================
// SECTION: Circuit Breaker
// ============================================================================

/// Per-vendor circuit breaker.
pub struct VendorCircuitBreaker {
    /// Thresholds.
    config: CircuitBreakerConfig,
    /// Buckets by vendor key.
    buckets: Mutex<HashMap<String, BreakerBucket>>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl VendorCircuitBreaker {
    /// Creates a breaker with every vendor closed.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the configured thresholds.
    #[must_use]
    pub const fn config(&self) -> CircuitBreakerConfig {
        self.config
    }

    /// Returns true when calls to `vendor` should be skipped.
    ///
    /// An open breaker whose reset window has elapsed is closed and its
    /// counter cleared as part of this query.
    pub fn is_open(&self, vendor: &str) -> bool {
        let mut buckets = self.lock();
        let Some(bucket) = buckets.get(vendor).copied() else {
            return false;
        };
        if bucket.failure_count < self.config.threshold {
            return false;
        }
        match bucket.opened_at {
            Some(opened_at)
                if self.clock.now().saturating_duration_since(opened_at)
                    > self.config.reset_window =>
            {
                buckets.remove(vendor);
                false
            }
            _ => true,
        }
    }

    /// Records a failed call to `vendor`.
    pub fn record_failure(&self, vendor: &str) {
        let now = self.clock.now();
        let mut buckets = self.lock();
        let bucket = buckets.entry(vendor.to_string()).or_default();
        bucket.failure_count = bucket.failure_count.saturating_add(1);
        if bucket.failure_count >= self.config.threshold && bucket.opened_at.is_none() {
            bucket.opened_at = Some(now);
        }
    }

    /// Records a successful call to `vendor`, closing its breaker.
    pub fn record_success(&self, vendor: &str) {
        self.lock().remove(vendor);
    }

    /// Returns the consecutive failure count for `vendor`.
    #[must_use]
    pub fn failure_count(&self, vendor: &str) -> u32 {
        self.lock().get(vendor).map_or(0, |bucket| bucket.failure_count)
    }

    /// Clears every vendor bucket.
    pub fn reset(&self) {
        self.lock().clear();
    }

    /// Acquires the bucket map.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, BreakerBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
