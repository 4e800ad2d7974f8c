//! Testing utilities for the remedy workspace
//!
//! Canned events, an outage-simulating audit store, and notification
//! channel doubles shared by the integration suites.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use remedy_alert::{Alert, AlertError, NotificationChannel};
use remedy_audit::{AuditError, AuditQuery, AuditStore, InMemoryAuditStore};
use remedy_core::{AuditEntry, RawEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Event that classifies as `unsanitized-input` and heals autonomously
pub fn template_injection_event(resource: &str) -> RawEvent {
    RawEvent::new("unsanitized input rendered into intake template").with_resource(resource)
}

/// Event that classifies as `sensitive-log-leak`
pub fn log_leak_event(resource: &str) -> RawEvent {
    RawEvent::new("sensitive field written to log output").with_resource(resource)
}

/// Event that classifies as `leaked-handle`; resource hint may list several
/// resources to push the blast radius over the approval threshold
pub fn leaked_handle_event(resources: &str) -> RawEvent {
    RawEvent::new("connection leak exhausting listener sockets").with_resource(resources)
}

/// Event no catalog signature matches
pub fn unknown_event() -> RawEvent {
    RawEvent::new("glitch nobody has catalogued")
}

/// Audit store that simulates a persistence outage until told otherwise
pub struct FlakyStore {
    inner: InMemoryAuditStore,
    down: AtomicBool,
}

impl FlakyStore {
    #[must_use]
    pub fn new(down: bool) -> Self {
        Self {
            inner: InMemoryAuditStore::new(),
            down: AtomicBool::new(down),
        }
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AuditStore for FlakyStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AuditError::StoreUnavailable("simulated outage".into()));
        }
        self.inner.append(entry).await
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.inner.query(query).await
    }

    async fn prune(&self, before: DateTime<Utc>) -> Result<usize, AuditError> {
        self.inner.prune(before).await
    }
}

/// Channel that records every alert it accepts
pub struct RecordingChannel {
    name: &'static str,
    delivered: Arc<Mutex<Vec<Alert>>>,
}

impl RecordingChannel {
    #[must_use]
    pub fn new(name: &'static str) -> (Arc<Self>, Arc<Mutex<Vec<Alert>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                name,
                delivered: Arc::clone(&delivered),
            }),
            delivered,
        )
    }
}

#[async_trait::async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        self.delivered.lock().push(alert.clone());
        Ok(())
    }
}

/// Channel that refuses every delivery
pub struct FailingChannel {
    name: &'static str,
}

impl FailingChannel {
    #[must_use]
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self { name })
    }
}

#[async_trait::async_trait]
impl NotificationChannel for FailingChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn send(&self, _alert: &Alert) -> Result<(), AlertError> {
        Err(AlertError::DeliveryFailed {
            channel: self.name.to_string(),
            reason: "simulated".into(),
        })
    }
}
