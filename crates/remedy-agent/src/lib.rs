//! Remedy Agent - pipeline orchestration for autonomous incident healing
//!
//! The brain wires the workspace together:
//!
//! - [`AgentConfig`]: one read-only config unit for catalog, policy, gates,
//!   audit and redaction, replaced only by a versioned [`AgentBrain::reload`]
//! - [`AgentBrain`]: classify -> validate -> gate -> sandbox -> apply, with
//!   exactly one audit entry per traversed stage and a pending-approval
//!   table for everything routed to humans
//! - [`TargetStore`]: the seam to the live resources healing operates on
//!
//! # Example
//!
//! ```rust,no_run
//! use remedy_agent::{AgentBrain, AgentConfig, InMemoryTargetStore};
//! use remedy_audit::{AuditConfig, AuditLogger, InMemoryAuditStore};
//! use remedy_core::RawEvent;
//! use remedy_strategy::StrategyRegistry;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), remedy_agent::AgentError> {
//! let audit = Arc::new(AuditLogger::new(
//!     Arc::new(InMemoryAuditStore::new()),
//!     AuditConfig::default(),
//! ));
//! let brain = AgentBrain::new(
//!     AgentConfig::default(),
//!     Arc::new(StrategyRegistry::with_defaults()),
//!     audit,
//!     Arc::new(InMemoryTargetStore::new()),
//! )?;
//! let report = brain
//!     .submit_event(RawEvent::new("unsanitized input in intake form"))
//!     .await?;
//! println!("{:?}", report.outcome);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod brain;
pub mod config;
pub mod error;

pub use brain::{AgentBrain, InMemoryTargetStore, IssueOutcome, IssueReport, TargetStore};
pub use config::{AgentConfig, RedactionRuleConfig};
pub use error::AgentError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
