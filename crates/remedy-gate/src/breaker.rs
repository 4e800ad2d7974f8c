//! Circuit breaker
//!
//! Per-dependency three-state guard: closed -> open -> half-open ->
//! {closed | open}. No other transition is legal. While open, calls fail
//! fast without touching the wrapped dependency; after the cooldown exactly
//! one probe is let through.

use crate::clock::{Clock, SystemClock};
use crate::error::GateError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Breaker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Cooldown before the first half-open probe, seconds
    pub cooldown_secs: u64,
    /// Cooldown multiplier applied when a probe fails
    pub backoff_factor: u32,
    /// Upper bound on the backed-off cooldown, seconds
    pub max_cooldown_secs: u64,
}

impl BreakerConfig {
    /// Base cooldown as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 30,
            backoff_factor: 2,
            max_cooldown_secs: 300,
        }
    }
}

/// Breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Calls pass through; failures are counted
    Closed,
    /// Calls fail fast
    Open,
    /// Exactly one probe call is in flight
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        };
        write!(f, "{s}")
    }
}

/// Observable breaker state, for audit notes and dashboards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// Breaker name
    pub name: String,
    /// Current state
    pub state: BreakerState,
    /// Consecutive failures while closed
    pub consecutive_failures: u32,
    /// Wall-clock time of the last state transition
    pub last_transition: DateTime<Utc>,
    /// Time until a probe becomes eligible, when open
    pub retry_in: Option<Duration>,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    /// Cooldown currently in force (grows on failed probes)
    cooldown: Duration,
    next_retry: Option<Instant>,
    probe_in_flight: bool,
    last_transition: DateTime<Utc>,
}

/// Per-dependency circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create breaker on the system clock
    #[must_use]
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    /// Create breaker on an injected clock
    #[must_use]
    pub fn with_clock(
        name: impl Into<String>,
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                cooldown: config.cooldown(),
                next_retry: None,
                probe_in_flight: false,
                last_transition: Utc::now(),
            }),
        }
    }

    /// Breaker name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request permission to call the wrapped dependency
    ///
    /// The half-open probe slot is claimed under the lock, so exactly one
    /// caller wins it.
    ///
    /// # Errors
    /// Returns [`GateError::CircuitOpen`] while open or while a probe is
    /// already in flight.
    pub fn acquire(&self) -> Result<(), GateError> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let eligible = inner.next_retry.map(|at| now >= at).unwrap_or(true);
                if eligible {
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    inner.last_transition = Utc::now();
                    tracing::info!(breaker = %self.name, "half-open, probing");
                    Ok(())
                } else {
                    Err(GateError::CircuitOpen {
                        name: self.name.clone(),
                        retry_in: inner
                            .next_retry
                            .map(|at| at.saturating_duration_since(now))
                            .unwrap_or_default(),
                    })
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(GateError::CircuitOpen {
                        name: self.name.clone(),
                        retry_in: Duration::ZERO,
                    })
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Report a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => inner.consecutive_failures = 0,
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Closed;
                inner.consecutive_failures = 0;
                inner.cooldown = self.config.cooldown();
                inner.next_retry = None;
                inner.probe_in_flight = false;
                inner.last_transition = Utc::now();
                tracing::info!(breaker = %self.name, "probe succeeded, closed");
            }
            // A success cannot arrive while open: acquire() fails fast.
            BreakerState::Open => {}
        }
    }

    /// Report a failed (or timed-out) call
    pub fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = BreakerState::Open;
                    inner.next_retry = Some(now + inner.cooldown);
                    inner.last_transition = Utc::now();
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.consecutive_failures,
                        "threshold exceeded, opened"
                    );
                }
            }
            BreakerState::HalfOpen => {
                let backed_off = inner
                    .cooldown
                    .saturating_mul(self.config.backoff_factor.max(1));
                let cap = Duration::from_secs(self.config.max_cooldown_secs);
                inner.cooldown = backed_off.min(cap);
                inner.state = BreakerState::Open;
                inner.next_retry = Some(now + inner.cooldown);
                inner.probe_in_flight = false;
                inner.last_transition = Utc::now();
                tracing::warn!(
                    breaker = %self.name,
                    cooldown_secs = inner.cooldown.as_secs(),
                    "probe failed, reopened"
                );
            }
            BreakerState::Open => {}
        }
    }

    /// Release a permit without reporting an outcome
    ///
    /// For callers that acquired but never reached the wrapped dependency
    /// (e.g. a preflight check failed first). Frees a claimed half-open
    /// probe slot; a no-op otherwise.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock();
        if inner.state == BreakerState::HalfOpen && inner.probe_in_flight {
            inner.probe_in_flight = false;
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    /// Observable snapshot
    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let inner = self.inner.lock();
        CircuitSnapshot {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_transition: inner.last_transition,
            retry_in: match inner.state {
                BreakerState::Open => inner
                    .next_retry
                    .map(|at| at.saturating_duration_since(now)),
                _ => None,
            },
        }
    }
}

/// Lazily-populated registry of breakers, one per external dependency
#[derive(Debug)]
pub struct BreakerRegistry {
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Create registry on the system clock
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create registry on an injected clock
    #[must_use]
    pub fn with_clock(config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            breakers: DashMap::new(),
        }
    }

    /// Get or lazily create the breaker for a dependency
    #[must_use]
    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(&existing);
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::with_clock(
                    name,
                    self.config,
                    Arc::clone(&self.clock),
                ))
            })
            .clone()
    }

    /// Snapshots of every known breaker
    #[must_use]
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        self.breakers.iter().map(|b| b.snapshot()).collect()
    }
}
