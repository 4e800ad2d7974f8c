//! Error types for audit logging
//!
//! Persistence failure is the one systemically serious condition in the
//! whole agent: entries are buffered, never dropped, and a buffer overflow
//! suspends live healing rather than losing audit fidelity.

/// Audit logging errors
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// Backend rejected or could not take the write
    #[error("audit store unavailable: {0}")]
    StoreUnavailable(String),

    /// Durable write did not complete within the deadline
    #[error("audit write timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Local fallback buffer is full; healing must stop
    #[error("audit fallback buffer overflow ({capacity} entries); live healing suspended")]
    BufferOverflow { capacity: usize },

    /// Prune window would violate the retention policy
    #[error("retention violation: {0}")]
    RetentionViolation(String),

    /// Entry (de)serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error from the file-backed store
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuditError {
    /// Whether retrying the same write later can succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_) | Self::Timeout { .. } | Self::Io(_)
        )
    }
}
