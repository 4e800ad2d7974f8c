//! Remedy Gate - backpressure components for the healing pipeline
//!
//! Provides the two long-lived shared-state guards:
//! - [`SlidingWindowLimiter`]: per-strategy action-storm prevention with
//!   atomic check-then-commit
//! - [`CircuitBreaker`] / [`BreakerRegistry`]: per-dependency
//!   closed/open/half-open guards wrapping every external call
//!
//! Both run against an injected [`Clock`], so tests never sleep.

#![warn(unreachable_pub)]

pub mod breaker;
pub mod clock;
pub mod error;
pub mod limiter;

pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker, CircuitSnapshot};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::GateError;
pub use limiter::{RateLimitConfig, SlidingWindowLimiter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
