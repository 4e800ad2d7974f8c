//! Per-strategy sliding-window rate limiter
//!
//! Prevents action storms: at most `max_actions` passes per rolling window,
//! keyed by strategy name. The check-then-commit in
//! [`SlidingWindowLimiter::try_acquire`] is atomic per key, so concurrent
//! issues cannot both take the last slot.

use crate::clock::{Clock, SystemClock};
use crate::error::GateError;
use dashmap::DashMap;
use parking_lot::Mutex;
use remedy_core::RateSnapshot;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Rate-limit tuning
///
/// Window size and capacity are deployment decisions, not correctness
/// constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RateLimitConfig {
    /// Maximum passes per window
    pub max_actions: u32,
    /// Rolling window length in seconds
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Window as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_actions: 5,
            window_secs: 60,
        }
    }
}

/// Sliding-window counter keyed by strategy name
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    windows: DashMap<String, Mutex<VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    /// Create limiter on the system clock
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create limiter on an injected clock
    #[must_use]
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            windows: DashMap::new(),
        }
    }

    /// Non-committing gate check
    ///
    /// Prefer [`SlidingWindowLimiter::try_acquire`] in concurrent paths; a
    /// separate `allow`/`record` pair leaves a window for two callers to
    /// observe the same free slot.
    #[must_use]
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self.window_for(key);
        let mut window = entry.lock();
        Self::expire(&mut window, now, self.config.window());
        (window.len() as u32) < self.config.max_actions
    }

    /// Commit a pass without checking
    pub fn record(&self, key: &str) {
        let now = self.clock.now();
        let entry = self.window_for(key);
        entry.lock().push_back(now);
    }

    /// Atomic check-then-commit
    ///
    /// # Errors
    /// Returns [`GateError::RateLimited`] with a window snapshot when the
    /// window is full. Denial is backpressure, not a fault.
    pub fn try_acquire(&self, key: &str) -> Result<RateSnapshot, GateError> {
        let now = self.clock.now();
        let entry = self.window_for(key);
        let mut window = entry.lock();
        Self::expire(&mut window, now, self.config.window());

        if (window.len() as u32) >= self.config.max_actions {
            let snapshot = self.snapshot_locked(&window);
            tracing::debug!(key, used = snapshot.used, "rate limiter refused");
            return Err(GateError::RateLimited {
                strategy: key.to_string(),
                snapshot,
            });
        }

        window.push_back(now);
        Ok(self.snapshot_locked(&window))
    }

    /// Window state for a key at this moment
    #[must_use]
    pub fn snapshot(&self, key: &str) -> RateSnapshot {
        let now = self.clock.now();
        let entry = self.window_for(key);
        let mut window = entry.lock();
        Self::expire(&mut window, now, self.config.window());
        self.snapshot_locked(&window)
    }

    fn snapshot_locked(&self, window: &VecDeque<Instant>) -> RateSnapshot {
        RateSnapshot {
            used: window.len() as u32,
            max: self.config.max_actions,
            window_secs: self.config.window_secs,
        }
    }

    fn window_for(
        &self,
        key: &str,
    ) -> dashmap::mapref::one::Ref<'_, String, Mutex<VecDeque<Instant>>> {
        if let Some(entry) = self.windows.get(key) {
            return entry;
        }
        self.windows
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(VecDeque::new()))
            .downgrade()
    }

    fn expire(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
        while let Some(&front) = window.front() {
            if now.duration_since(front) >= span {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn limiter(max: u32, window_secs: u64) -> (SlidingWindowLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = SlidingWindowLimiter::with_clock(
            RateLimitConfig {
                max_actions: max,
                window_secs,
            },
            Arc::new(clock.clone()),
        );
        (limiter, clock)
    }

    #[test]
    fn passes_up_to_capacity() {
        let (limiter, _clock) = limiter(3, 60);
        for _ in 0..3 {
            assert!(limiter.try_acquire("sanitize").is_ok());
        }
        assert!(matches!(
            limiter.try_acquire("sanitize"),
            Err(GateError::RateLimited { .. })
        ));
    }

    #[test]
    fn keys_are_independent() {
        let (limiter, _clock) = limiter(1, 60);
        assert!(limiter.try_acquire("sanitize").is_ok());
        assert!(limiter.try_acquire("redact").is_ok());
        assert!(limiter.try_acquire("sanitize").is_err());
    }

    #[test]
    fn window_slides() {
        let (limiter, clock) = limiter(1, 60);
        assert!(limiter.try_acquire("sanitize").is_ok());
        assert!(limiter.try_acquire("sanitize").is_err());
        clock.advance(Duration::from_secs(61));
        assert!(limiter.try_acquire("sanitize").is_ok());
    }

    #[test]
    fn allow_does_not_commit() {
        let (limiter, _clock) = limiter(1, 60);
        assert!(limiter.allow("sanitize"));
        assert!(limiter.allow("sanitize")); // still free: nothing committed
        limiter.record("sanitize");
        assert!(!limiter.allow("sanitize"));
    }

    #[test]
    fn snapshot_reports_window_state() {
        let (limiter, _clock) = limiter(5, 60);
        limiter.try_acquire("sanitize").unwrap();
        limiter.try_acquire("sanitize").unwrap();
        let snapshot = limiter.snapshot("sanitize");
        assert_eq!(snapshot.used, 2);
        assert_eq!(snapshot.max, 5);
        assert_eq!(snapshot.window_secs, 60);
    }

    #[test]
    fn concurrent_acquires_respect_capacity() {
        let (limiter, _clock) = limiter(4, 60);
        let limiter = Arc::new(limiter);
        let mut handles = Vec::new();
        for _ in 0..16 {
            let limiter = Arc::clone(&limiter);
            handles.push(std::thread::spawn(move || {
                limiter.try_acquire("sanitize").is_ok()
            }));
        }
        let passed = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|&p| p)
            .count();
        assert_eq!(passed, 4);
        assert_eq!(limiter.snapshot("sanitize").used, 4);
    }
}
