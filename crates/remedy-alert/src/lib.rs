//! Remedy Alert - realtime monitoring and escalating notification
//!
//! Provides:
//! - [`NotificationChannel`]: transport adapter boundary (email, chat,
//!   paging); the agent owns gating and retry, adapters own transport
//! - [`AlertNotifier`]: ordered escalation with per-channel breaker and
//!   rate-limit window
//! - [`RealtimeMonitor`]: tails the committed audit stream and raises
//!   alerts on severity thresholds and review backlogs

#![warn(unreachable_pub)]

pub mod channel;
pub mod monitor;
pub mod notifier;

pub use channel::{Alert, AlertError, NotificationChannel};
pub use monitor::{MonitorConfig, RealtimeMonitor};
pub use notifier::AlertNotifier;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
