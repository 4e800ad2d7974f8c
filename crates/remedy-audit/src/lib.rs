//! Remedy Audit - durable, append-only audit logging
//!
//! Provides:
//! - [`AuditStore`]: the persistence adapter interface (at-least-once
//!   append, filterable query, retention prune)
//! - [`InMemoryAuditStore`] / [`JsonlAuditStore`]: reference backends
//! - [`AuditLogger`]: durable-before-ack recorder with a bounded local
//!   fallback buffer and a committed-entry broadcast for the monitor

#![warn(unreachable_pub)]

pub mod error;
pub mod file_store;
pub mod logger;
pub mod store;

pub use error::AuditError;
pub use file_store::JsonlAuditStore;
pub use logger::{AuditConfig, AuditHealth, AuditLogger, RecordAck};
pub use store::{AuditQuery, AuditStore, InMemoryAuditStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
