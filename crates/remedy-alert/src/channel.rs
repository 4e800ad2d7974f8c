//! Notification channel boundary
//!
//! Each external channel (email, chat, paging) is an adapter implementing
//! [`NotificationChannel`]. The agent owns retry, rate limiting and circuit
//! breaking; adapters own transport details only.

use chrono::{DateTime, Utc};
use remedy_core::{CorrelationId, Severity};
use serde::{Deserialize, Serialize};

/// An alert raised by the realtime monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Severity of the triggering condition
    pub severity: Severity,
    /// Operator-facing summary (already redacted)
    pub summary: String,
    /// Correlation id of the triggering issue, when there is one
    pub correlation_id: Option<CorrelationId>,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    /// Create an alert raised now
    #[must_use]
    pub fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            correlation_id: None,
            raised_at: Utc::now(),
        }
    }

    /// Link the triggering issue
    #[inline]
    #[must_use]
    pub fn with_correlation(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// Errors surfaced by alert delivery
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// The channel transport reported a failure
    #[error("delivery failed on '{channel}': {reason}")]
    DeliveryFailed {
        /// Channel that failed
        channel: String,
        /// Transport-reported reason
        reason: String,
    },

    /// Delivery exceeded its deadline
    #[error("delivery timed out on '{channel}'")]
    Timeout {
        /// Channel that timed out
        channel: String,
    },

    /// Every channel in the escalation order was unavailable
    #[error("all {attempted} notification channels failed or were gated")]
    AllChannelsFailed {
        /// Channels tried
        attempted: usize,
    },
}

/// Transport adapter for one external notification channel
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name (unique within the escalation order)
    fn name(&self) -> &str;

    /// Deliver one alert
    ///
    /// # Errors
    /// Returns [`AlertError::DeliveryFailed`] when the transport rejects
    /// the message.
    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}
