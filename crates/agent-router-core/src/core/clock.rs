// agent-router-core/src/core/clock.rs
// ============================================================================
// Module: Agent Router Clock
// Description: Monotonic time source and blocking sleep abstraction.
// Purpose: Let breaker, limiter, and handshake backoff run on injected time.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Stateful components never read [`Instant::now`] directly. They hold an
//! `Arc<dyn Clock>` so production uses [`SystemClock`] while tests drive a
//! [`ManualClock`] and assert on the sleeps that were requested.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Monotonic clock with a blocking sleep.
pub trait Clock: Send + Sync {
    /// Returns the current monotonic instant.
    fn now(&self) -> Instant;

    /// Blocks the calling thread for `duration`.
    fn sleep(&self, duration: Duration);
}

// ============================================================================
// SECTION: System Clock
// ============================================================================

/// Clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

// ============================================================================
// SECTION: Manual Clock
// ============================================================================

/// Deterministic clock whose time only moves when advanced or slept.
///
/// `sleep` returns immediately after advancing the clock and recording the
/// requested duration.
#[derive(Debug)]
pub struct ManualClock {
    /// Fixed origin captured at construction.
    base: Instant,
    /// Elapsed simulated time since `base`.
    offset: Mutex<Duration>,
    /// Every duration passed to `sleep`, in call order.
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    /// Creates a manual clock anchored at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Moves simulated time forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += duration;
    }

    /// Returns the durations requested through `sleep` so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        self.base + offset
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap_or_else(PoisonError::into_inner).push(duration);
        self.advance(duration);
    }
}
