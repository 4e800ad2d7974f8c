//! Remedy Core - shared primitives for the incident-healing agent
//!
//! Defines the data model every other crate builds on:
//! - Strongly-typed ids and correlation tokens
//! - Issues (classified problems) and their severity/category taxonomy
//! - Healing actions with tagged-union payloads and declared rollbacks
//! - Audit entries, the unit of compliance evidence
//! - State digests for before/after evidence
//! - The redacting log middleware all components emit through
//!
//! # Example
//!
//! ```rust
//! use remedy_core::{RawEvent, RedactingLogger};
//!
//! let event = RawEvent::new("query timeout on appointment search")
//!     .with_resource("scheduler");
//! let logger = RedactingLogger::with_defaults();
//! logger.info("ingest", &event.message);
//! ```

#![warn(unreachable_pub)]

pub mod action;
pub mod audit;
pub mod digest;
pub mod id;
pub mod issue;
pub mod redact;

// Re-exports for convenience
pub use action::{ActionPayload, ActionStatus, HealingAction, RollbackPlan};
pub use audit::{Actor, AuditEntry, Outcome, PipelineStage, RateSnapshot, SafetyDecision};
pub use digest::{DigestError, StateDigest};
pub use id::{ActionId, CorrelationId, EntryId, IssueId};
pub use issue::{Category, Issue, IssueContext, RawEvent, Severity};
pub use redact::{RedactingLogger, RedactionPattern};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with remedy types
    pub use crate::{
        ActionPayload, ActionStatus, Actor, AuditEntry, Category, CorrelationId, HealingAction,
        Issue, IssueId, Outcome, PipelineStage, RawEvent, RedactingLogger, RollbackPlan,
        SafetyDecision, Severity, StateDigest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
