//! Remedy Strategy - healing strategy library and sandbox executor
//!
//! Provides:
//! - [`HealingStrategy`]: idempotent remediation with a declared rollback
//! - [`StrategyRegistry`]: immutable name -> implementation map, built once
//!   at startup and passed to the agent brain explicitly
//! - [`SandboxExecutor`]: tests candidate actions on isolated copies before
//!   live apply, including an idempotence re-apply check

#![warn(unreachable_pub)]

pub mod builtin;
pub mod error;
pub mod sandbox;
pub mod strategy;
pub mod target;

pub use builtin::{
    InstallBreakerWrapper, ParameterizeQuery, RedactSensitiveLogField, ReleaseLeakedHandle,
    SanitizeUnsafeInput,
};
pub use error::StrategyError;
pub use sandbox::{SandboxExecutor, TestResult};
pub use strategy::{apply_payload, apply_rollback, HealingStrategy, StrategyRegistry};
pub use target::HealTarget;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
