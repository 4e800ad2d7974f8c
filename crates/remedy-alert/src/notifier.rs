//! Escalating alert notifier
//!
//! Delivery policy is an ordered channel list, not nested conditionals:
//! the first channel that is un-throttled, un-broken and delivers wins.
//! Every channel carries its own circuit breaker and its own rate-limit
//! window, so a noisy email provider never throttles paging.

use crate::channel::{Alert, AlertError, NotificationChannel};
use remedy_gate::{BreakerConfig, CircuitBreaker, RateLimitConfig, SlidingWindowLimiter};
use std::sync::Arc;
use std::time::Duration;

struct ChannelSlot {
    channel: Arc<dyn NotificationChannel>,
    breaker: CircuitBreaker,
    limiter: SlidingWindowLimiter,
}

/// Fan-out notifier with per-channel gating and escalation order
pub struct AlertNotifier {
    slots: Vec<ChannelSlot>,
    send_timeout: Duration,
}

impl AlertNotifier {
    /// Create empty notifier with a per-delivery deadline
    #[must_use]
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            slots: Vec::new(),
            send_timeout,
        }
    }

    /// Append a channel to the escalation order
    #[must_use]
    pub fn with_channel(
        mut self,
        channel: Arc<dyn NotificationChannel>,
        breaker_config: BreakerConfig,
        rate_config: RateLimitConfig,
    ) -> Self {
        let name = channel.name().to_string();
        self.slots.push(ChannelSlot {
            channel,
            breaker: CircuitBreaker::new(name, breaker_config),
            limiter: SlidingWindowLimiter::new(rate_config),
        });
        self
    }

    /// Number of configured channels
    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.slots.len()
    }

    /// Deliver an alert through the escalation order
    ///
    /// Returns the name of the channel that accepted it.
    ///
    /// # Errors
    /// Returns [`AlertError::AllChannelsFailed`] when every channel was
    /// throttled, open, failing or timing out.
    pub async fn notify(&self, alert: &Alert) -> Result<String, AlertError> {
        for slot in &self.slots {
            let name = slot.channel.name().to_string();

            if slot.limiter.try_acquire(&name).is_err() {
                tracing::debug!(channel = %name, "channel throttled, escalating");
                continue;
            }
            if slot.breaker.acquire().is_err() {
                tracing::debug!(channel = %name, "channel breaker open, escalating");
                continue;
            }

            match tokio::time::timeout(self.send_timeout, slot.channel.send(alert)).await {
                Ok(Ok(())) => {
                    slot.breaker.record_success();
                    tracing::info!(channel = %name, severity = %alert.severity, "alert delivered");
                    return Ok(name);
                }
                Ok(Err(e)) => {
                    slot.breaker.record_failure();
                    tracing::warn!(channel = %name, error = %e, "delivery failed, escalating");
                }
                Err(_) => {
                    // Deadline overrun counts as a failure for the breaker.
                    slot.breaker.record_failure();
                    tracing::warn!(channel = %name, "delivery timed out, escalating");
                }
            }
        }

        Err(AlertError::AllChannelsFailed {
            attempted: self.slots.len(),
        })
    }
}

impl std::fmt::Debug for AlertNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.slots.iter().map(|s| s.channel.name()).collect();
        f.debug_struct("AlertNotifier")
            .field("channels", &names)
            .field("send_timeout", &self.send_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use remedy_core::Severity;

    struct RecordingChannel {
        name: &'static str,
        delivered: Arc<Mutex<Vec<Alert>>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
            if self.fail {
                return Err(AlertError::DeliveryFailed {
                    channel: self.name.to_string(),
                    reason: "simulated".into(),
                });
            }
            self.delivered.lock().push(alert.clone());
            Ok(())
        }
    }

    fn channel(
        name: &'static str,
        fail: bool,
    ) -> (Arc<RecordingChannel>, Arc<Mutex<Vec<Alert>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(RecordingChannel {
                name,
                delivered: Arc::clone(&delivered),
                fail,
            }),
            delivered,
        )
    }

    fn notifier_with(channels: Vec<Arc<RecordingChannel>>) -> AlertNotifier {
        let mut notifier = AlertNotifier::new(Duration::from_millis(200));
        for ch in channels {
            notifier = notifier.with_channel(
                ch,
                BreakerConfig::default(),
                RateLimitConfig {
                    max_actions: 10,
                    window_secs: 60,
                },
            );
        }
        notifier
    }

    #[tokio::test]
    async fn first_healthy_channel_wins() {
        let (email, email_log) = channel("email", false);
        let (pager, pager_log) = channel("pager", false);
        let notifier = notifier_with(vec![email, pager]);

        let used = notifier
            .notify(&Alert::new(Severity::High, "review backlog"))
            .await
            .unwrap();
        assert_eq!(used, "email");
        assert_eq!(email_log.lock().len(), 1);
        assert!(pager_log.lock().is_empty());
    }

    #[tokio::test]
    async fn failure_escalates_to_next_channel() {
        let (email, _) = channel("email", true);
        let (pager, pager_log) = channel("pager", false);
        let notifier = notifier_with(vec![email, pager]);

        let used = notifier
            .notify(&Alert::new(Severity::Critical, "backend outage"))
            .await
            .unwrap();
        assert_eq!(used, "pager");
        assert_eq!(pager_log.lock().len(), 1);
    }

    #[tokio::test]
    async fn all_failing_channels_error() {
        let (email, _) = channel("email", true);
        let (chat, _) = channel("chat", true);
        let notifier = notifier_with(vec![email, chat]);

        let err = notifier
            .notify(&Alert::new(Severity::High, "unreachable"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AlertError::AllChannelsFailed { attempted: 2 }
        ));
    }

    #[tokio::test]
    async fn throttled_channel_is_skipped_not_counted_failed() {
        let (email, email_log) = channel("email", false);
        let (pager, pager_log) = channel("pager", false);
        let mut notifier = AlertNotifier::new(Duration::from_millis(200));
        notifier = notifier.with_channel(
            email,
            BreakerConfig::default(),
            RateLimitConfig {
                max_actions: 1,
                window_secs: 60,
            },
        );
        notifier = notifier.with_channel(
            pager,
            BreakerConfig::default(),
            RateLimitConfig {
                max_actions: 10,
                window_secs: 60,
            },
        );

        notifier
            .notify(&Alert::new(Severity::High, "first"))
            .await
            .unwrap();
        let used = notifier
            .notify(&Alert::new(Severity::High, "second"))
            .await
            .unwrap();
        assert_eq!(used, "pager"); // email window exhausted, escalated
        assert_eq!(email_log.lock().len(), 1);
        assert_eq!(pager_log.lock().len(), 1);
    }

    #[tokio::test]
    async fn repeated_failures_open_the_breaker() {
        let (email, _) = channel("email", true);
        let (pager, pager_log) = channel("pager", false);
        let mut notifier = AlertNotifier::new(Duration::from_millis(200));
        notifier = notifier.with_channel(
            email,
            BreakerConfig {
                failure_threshold: 2,
                ..BreakerConfig::default()
            },
            RateLimitConfig {
                max_actions: 100,
                window_secs: 60,
            },
        );
        notifier = notifier.with_channel(
            pager,
            BreakerConfig::default(),
            RateLimitConfig {
                max_actions: 100,
                window_secs: 60,
            },
        );

        for _ in 0..3 {
            notifier
                .notify(&Alert::new(Severity::High, "flap"))
                .await
                .unwrap();
        }
        // All three landed on the pager; email's breaker opened after two
        // failures and was skipped on the third pass.
        assert_eq!(pager_log.lock().len(), 3);
    }
}
