//! Remedy Signature - issue pattern catalog and event classification
//!
//! Provides:
//! - [`SignatureCatalog`]: static table of known issue patterns
//! - [`IssueAnalyzer`]: classifies raw events, never fails, degrades to the
//!   synthetic unknown signature when nothing matches

#![warn(unreachable_pub)]

pub mod analyzer;
pub mod catalog;

pub use analyzer::{IssueAnalyzer, UNKNOWN_SIGNATURE};
pub use catalog::{Matcher, Signature, SignatureCatalog};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
