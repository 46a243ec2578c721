// agent-router-core/src/runtime/rate_limit.rs
// ============================================================================
// Module: Agent Router Vendor Rate Limiter
// Description: Minimum-spacing gate keyed by vendor.
// Purpose: Keep outbound vendor requests under a requests-per-minute budget.
// Dependencies: crate::core::Clock
// ============================================================================

//! ## Overview
//! Each vendor key owns one slot timestamp. A caller reserves the next slot
//! under the lock, then sleeps outside it, so a caller waiting on one vendor
//! never holds up callers for another. There is no burst allowance: calls
//! are spaced by at least `60 / rpm` seconds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use crate::core::Clock;

// ============================================================================
// SECTION: Rate Limiter
// ============================================================================

/// Per-vendor minimum-interval limiter.
pub struct VendorRateLimiter {
    /// Minimum spacing between calls for the same vendor.
    interval: Duration,
    /// Instant of the most recent reserved call per vendor.
    last_call: Mutex<HashMap<String, Instant>>,
    /// Time source.
    clock: Arc<dyn Clock>,
}

impl VendorRateLimiter {
    /// Creates a limiter allowing `requests_per_minute` calls per vendor.
    ///
    /// A zero rate is treated as one request per minute.
    #[must_use]
    pub fn new(requests_per_minute: u32, clock: Arc<dyn Clock>) -> Self {
        let interval = Duration::from_secs_f64(60.0 / f64::from(requests_per_minute.max(1)));
        Self {
            interval,
            last_call: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Returns the configured minimum spacing.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Blocks until `vendor` may be called again and records the call.
    ///
    /// Returns how long the caller slept.
    pub fn wait(&self, vendor: &str) -> Duration {
        let delay = {
            let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);
            let now = self.clock.now();
            let slot = last_call
                .get(vendor)
                .map_or(now, |last| (*last + self.interval).max(now));
            last_call.insert(vendor.to_string(), slot);
            slot.saturating_duration_since(now)
        };
        if !delay.is_zero() {
            self.clock.sleep(delay);
        }
        delay
    }

    /// Clears all vendor timestamps.
    pub fn reset(&self) {
        self.last_call.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
