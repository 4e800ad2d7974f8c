//! File-backed audit store
//!
//! Append-only JSON-lines file. Each append writes one line and fsyncs
//! before acknowledging, so an acked entry survives process death.

use crate::error::AuditError;
use crate::store::{AuditQuery, AuditStore};
use chrono::{DateTime, Utc};
use remedy_core::AuditEntry;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// JSON-lines audit store
#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    // Serializes writers so interleaved lines cannot corrupt the file.
    write_lock: Mutex<()>,
}

impl JsonlAuditStore {
    /// Create store writing to `path` (created on first append)
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }
}

#[async_trait::async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .filter(|e| query.matches(e))
            .collect())
    }

    async fn prune(&self, before: DateTime<Utc>) -> Result<usize, AuditError> {
        let _guard = self.write_lock.lock().await;
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut kept = String::new();
        let mut removed = 0usize;
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let entry: AuditEntry = serde_json::from_str(line)?;
            if entry.timestamp >= before {
                kept.push_str(line);
                kept.push('\n');
            } else {
                removed += 1;
            }
        }

        // Rewrite atomically: temp file then rename.
        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, kept).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remedy_core::{
        Category, CorrelationId, Issue, IssueContext, IssueId, Outcome, PipelineStage, Severity,
    };

    fn entry() -> AuditEntry {
        let issue = Issue {
            id: IssueId::new(),
            correlation_id: CorrelationId::new(),
            created_at: Utc::now(),
            signature_id: "leaked-handle".into(),
            category: Category::ResourceLeak,
            severity: Severity::Medium,
            affected_resources: vec!["hl7-listener".into()],
            context: IssueContext {
                message: "listener leak".into(),
                stack: None,
                actor_id: None,
                session_id: None,
            },
        };
        AuditEntry::new(&issue, PipelineStage::Classified, Outcome::Success)
    }

    #[tokio::test]
    async fn append_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let store = JsonlAuditStore::new(&path);
            store.append(&entry()).await.unwrap();
            store.append(&entry()).await.unwrap();
        }

        let reopened = JsonlAuditStore::new(&path);
        let all = reopened.query(&AuditQuery::all()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn query_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAuditStore::new(dir.path().join("absent.jsonl"));
        assert!(store.query(&AuditQuery::all()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_keep_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAuditStore::new(dir.path().join("audit.jsonl"));
        let first = entry();
        let second = entry();
        store.append(&first).await.unwrap();
        store.append(&second).await.unwrap();

        let all = store.query(&AuditQuery::all()).await.unwrap();
        assert_eq!(all[0].id, first.id);
        assert_eq!(all[1].id, second.id);
    }

    #[tokio::test]
    async fn prune_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlAuditStore::new(dir.path().join("audit.jsonl"));
        store.append(&entry()).await.unwrap();
        let removed = store
            .prune(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.query(&AuditQuery::all()).await.unwrap().is_empty());
    }
}
