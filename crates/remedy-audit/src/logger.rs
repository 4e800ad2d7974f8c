//! Audit logger
//!
//! Append-only recorder for every pipeline decision and action. Writes are
//! durable before acknowledgement. When the backend is unreachable the
//! logger degrades to a bounded in-memory buffer, preserving submission
//! order, and flushes on recovery. Buffer overflow suspends live healing:
//! audit completeness is a harder invariant than healing availability.

use crate::error::AuditError;
use crate::store::{AuditQuery, AuditStore};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use remedy_core::AuditEntry;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};

/// Audit logger tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Fallback buffer capacity; overflow suspends healing
    pub buffer_capacity: usize,
    /// Deadline for one durable write, milliseconds
    pub record_timeout_ms: u64,
    /// Retention window in days (compliance requirement, multi-year)
    pub retention_days: i64,
}

impl AuditConfig {
    /// Record deadline as a [`Duration`]
    #[inline]
    #[must_use]
    pub fn record_timeout(&self) -> Duration {
        Duration::from_millis(self.record_timeout_ms)
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1024,
            record_timeout_ms: 2_000,
            retention_days: 7 * 365,
        }
    }
}

/// How a record call completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAck {
    /// Durably persisted in the backend
    Durable,
    /// Backend unreachable; held in the local fallback buffer
    Buffered,
}

/// Health transition of the persistence path
///
/// Emitted on the side channel returned by
/// [`AuditLogger::subscribe_health`], so the realtime monitor can escalate
/// an outage that, by definition, leaves no committed entry behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditHealth {
    /// Backend writes started failing; entries are buffering locally
    BackendDegraded {
        /// The write error that marked the backend unreachable
        error: String,
    },
    /// The fallback buffer is full and live healing is suspended
    BufferOverflowed {
        /// Configured buffer capacity
        capacity: usize,
    },
    /// Backend recovered and the buffer drained in original order
    Recovered {
        /// Entries flushed by the recovering drain
        flushed: usize,
    },
}

/// Append-only audit recorder with a durable backend and local fallback
pub struct AuditLogger {
    store: Arc<dyn AuditStore>,
    config: AuditConfig,
    buffer: Mutex<VecDeque<AuditEntry>>,
    suspended: AtomicBool,
    degraded: AtomicBool,
    committed_tx: broadcast::Sender<AuditEntry>,
    health_tx: broadcast::Sender<AuditHealth>,
}

impl AuditLogger {
    /// Create logger over a store
    #[must_use]
    pub fn new(store: Arc<dyn AuditStore>, config: AuditConfig) -> Self {
        let (committed_tx, _) = broadcast::channel(256);
        let (health_tx, _) = broadcast::channel(64);
        Self {
            store,
            config,
            buffer: Mutex::new(VecDeque::new()),
            suspended: AtomicBool::new(false),
            degraded: AtomicBool::new(false),
            committed_tx,
            health_tx,
        }
    }

    /// Subscribe to the committed-entry stream
    ///
    /// Receivers only ever see entries that are durably persisted; the
    /// realtime monitor hangs off this, never off the agent brain.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEntry> {
        self.committed_tx.subscribe()
    }

    /// Subscribe to persistence health transitions
    ///
    /// Outage, overflow, and recovery cannot be observed from the committed
    /// stream; alarms for them ride this channel instead.
    #[must_use]
    pub fn subscribe_health(&self) -> broadcast::Receiver<AuditHealth> {
        self.health_tx.subscribe()
    }

    /// Whether live healing is suspended due to buffer overflow
    #[inline]
    #[must_use]
    pub fn is_healing_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Entries currently held in the fallback buffer
    pub async fn buffered(&self) -> usize {
        self.buffer.lock().await.len()
    }

    /// Record an entry
    ///
    /// Blocks until the entry is durable or buffered; never discards.
    ///
    /// # Errors
    /// Returns [`AuditError::BufferOverflow`] only when both the backend
    /// and the fallback buffer are exhausted. The entry that triggered the
    /// overflow is still retained by force-evicting nothing: the error is
    /// raised before any entry is dropped, and healing is suspended.
    pub async fn record(&self, entry: AuditEntry) -> Result<RecordAck, AuditError> {
        let mut buffer = self.buffer.lock().await;

        // Earlier entries must land first to preserve the stream order.
        if !buffer.is_empty() {
            self.drain_locked(&mut buffer).await;
        }

        if buffer.is_empty() {
            match self.try_append(&entry).await {
                Ok(()) => {
                    let _ = self.committed_tx.send(entry);
                    return Ok(RecordAck::Durable);
                }
                Err(e) => {
                    tracing::error!(error = %e, "audit backend unreachable, buffering locally");
                    if !self.degraded.swap(true, Ordering::SeqCst) {
                        let _ = self.health_tx.send(AuditHealth::BackendDegraded {
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        if buffer.len() >= self.config.buffer_capacity {
            if !self.suspended.swap(true, Ordering::SeqCst) {
                let _ = self.health_tx.send(AuditHealth::BufferOverflowed {
                    capacity: self.config.buffer_capacity,
                });
            }
            tracing::error!(
                capacity = self.config.buffer_capacity,
                "audit buffer overflow, suspending live healing"
            );
            return Err(AuditError::BufferOverflow {
                capacity: self.config.buffer_capacity,
            });
        }

        buffer.push_back(entry);
        Ok(RecordAck::Buffered)
    }

    /// Flush buffered entries to the backend in original order
    ///
    /// Returns the number flushed. Clears the healing suspension when the
    /// buffer fully drains.
    pub async fn flush(&self) -> usize {
        let mut buffer = self.buffer.lock().await;
        self.drain_locked(&mut buffer).await
    }

    /// Query the persisted stream
    ///
    /// # Errors
    /// Propagates backend errors.
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        self.store.query(query).await
    }

    /// Prune entries that fell out of the retention window
    ///
    /// # Errors
    /// Returns [`AuditError::RetentionViolation`] when `before` would
    /// delete entries the policy still requires.
    pub async fn prune(&self, before: DateTime<Utc>) -> Result<usize, AuditError> {
        let cutoff = Utc::now() - ChronoDuration::days(self.config.retention_days);
        if before > cutoff {
            return Err(AuditError::RetentionViolation(format!(
                "cannot prune newer than retention window ({} days)",
                self.config.retention_days
            )));
        }
        self.store.prune(before).await
    }

    async fn drain_locked(&self, buffer: &mut VecDeque<AuditEntry>) -> usize {
        let mut flushed = 0usize;
        while let Some(entry) = buffer.front() {
            match self.try_append(entry).await {
                Ok(()) => {
                    let entry = buffer.pop_front().expect("front checked above");
                    let _ = self.committed_tx.send(entry);
                    flushed += 1;
                }
                // Backend still down; keep order, try again next time.
                Err(_) => break,
            }
        }
        if buffer.is_empty() {
            if self.degraded.swap(false, Ordering::SeqCst) {
                let _ = self.health_tx.send(AuditHealth::Recovered { flushed });
            }
            if self.suspended.swap(false, Ordering::SeqCst) {
                tracing::info!("audit buffer drained, live healing resumed");
            }
        }
        flushed
    }

    async fn try_append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        match tokio::time::timeout(self.config.record_timeout(), self.store.append(entry)).await {
            Ok(result) => result,
            Err(_) => Err(AuditError::Timeout {
                timeout_ms: self.config.record_timeout_ms,
            }),
        }
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("config", &self.config)
            .field("suspended", &self.is_healing_suspended())
            .finish()
    }
}
