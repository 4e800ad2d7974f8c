//! Error types for gating
//!
//! Gate refusals are designed outcomes, not faults: callers log them as
//! throttled attempts and re-queue or expire the issue.

use remedy_core::RateSnapshot;
use std::time::Duration;

/// Gate refusal
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    /// Sliding window for the strategy is full
    #[error("rate limited: strategy '{strategy}' used {}/{} in {}s window", snapshot.used, snapshot.max, snapshot.window_secs)]
    RateLimited {
        /// Strategy key that was throttled
        strategy: String,
        /// Window state at refusal time
        snapshot: RateSnapshot,
    },

    /// Circuit breaker is open for a dependency
    #[error("circuit open: '{name}', retry eligible in {retry_in:?}")]
    CircuitOpen {
        /// Breaker name
        name: String,
        /// Time until the next half-open probe
        retry_in: Duration,
    },
}

impl GateError {
    /// Gate refusals are always transient backpressure
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        true
    }
}
