//! Remedy Safety - pure policy validation
//!
//! The validator is the last line of defense against irreversible
//! autonomous actions. It is a pure function over static policy: no I/O,
//! no shared state, first-match-wins rule evaluation.

#![warn(unreachable_pub)]

pub mod policy;
pub mod validator;

pub use policy::SafetyPolicy;
pub use validator::SafetyValidator;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
