//! Durable offline-operation queue.
//!
//! Every user action that must reach the persistence collaborator is first
//! appended here as an `OfflineOperation`. The queue is a JSONL file with
//! file locking for appends and an atomic rewrite for dequeues, so a crash
//! between operations never corrupts it. Operation ids are derived from the
//! real upstream session id plus a per-session counter - never from
//! locally-fabricated placeholders - which is what makes replay idempotent.

use crate::error::{Error, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Deterministic operation identifier: `{session_id}:{kind}:{seq}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(pub String);

impl OperationId {
    pub fn derive(session_id: SessionId, kind: &str, seq: u64) -> Self {
        Self(format!("{}:{}:{}", session_id, kind, seq))
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One queued persistence operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OfflineOperation {
    CreateSession {
        id: OperationId,
        enqueued_at: DateTime<Utc>,
        session: SessionRecord,
    },
    UpsertItem {
        id: OperationId,
        enqueued_at: DateTime<Utc>,
        item: ItemRecord,
    },
    InsertSetLog {
        id: OperationId,
        enqueued_at: DateTime<Utc>,
        set_log: SetLogEntry,
    },
    FinalizeSession {
        id: OperationId,
        enqueued_at: DateTime<Utc>,
        summary: SessionSummaryRecord,
    },
}

impl OfflineOperation {
    pub fn id(&self) -> &OperationId {
        match self {
            OfflineOperation::CreateSession { id, .. }
            | OfflineOperation::UpsertItem { id, .. }
            | OfflineOperation::InsertSetLog { id, .. }
            | OfflineOperation::FinalizeSession { id, .. } => id,
        }
    }

    pub fn enqueued_at(&self) -> DateTime<Utc> {
        match self {
            OfflineOperation::CreateSession { enqueued_at, .. }
            | OfflineOperation::UpsertItem { enqueued_at, .. }
            | OfflineOperation::InsertSetLog { enqueued_at, .. }
            | OfflineOperation::FinalizeSession { enqueued_at, .. } => *enqueued_at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OfflineOperation::CreateSession { .. } => "create_session",
            OfflineOperation::UpsertItem { .. } => "upsert_item",
            OfflineOperation::InsertSetLog { .. } => "insert_set_log",
            OfflineOperation::FinalizeSession { .. } => "finalize_session",
        }
    }
}

/// Builds operations for one session with deterministic sequential ids.
#[derive(Debug)]
pub struct OperationFactory {
    session_id: SessionId,
    seq: u64,
}

impl OperationFactory {
    pub fn new(session_id: SessionId) -> Self {
        Self { session_id, seq: 0 }
    }

    fn next_id(&mut self, kind: &str) -> OperationId {
        let id = OperationId::derive(self.session_id, kind, self.seq);
        self.seq += 1;
        id
    }

    pub fn create_session(
        &mut self,
        session: SessionRecord,
        at: DateTime<Utc>,
    ) -> OfflineOperation {
        OfflineOperation::CreateSession {
            id: self.next_id("create_session"),
            enqueued_at: at,
            session,
        }
    }

    pub fn upsert_item(&mut self, item: ItemRecord, at: DateTime<Utc>) -> OfflineOperation {
        OfflineOperation::UpsertItem {
            id: self.next_id("upsert_item"),
            enqueued_at: at,
            item,
        }
    }

    pub fn insert_set_log(
        &mut self,
        set_log: SetLogEntry,
        at: DateTime<Utc>,
    ) -> OfflineOperation {
        OfflineOperation::InsertSetLog {
            id: self.next_id("insert_set_log"),
            enqueued_at: at,
            set_log,
        }
    }

    pub fn finalize_session(
        &mut self,
        summary: SessionSummaryRecord,
        at: DateTime<Utc>,
    ) -> OfflineOperation {
        OfflineOperation::FinalizeSession {
            id: self.next_id("finalize_session"),
            enqueued_at: at,
            summary,
        }
    }
}

/// JSONL-backed durable queue with file locking.
pub struct OfflineQueue {
    path: PathBuf,
}

impl OfflineQueue {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append one operation under an exclusive lock.
    pub fn append(&self, operation: &OfflineOperation) -> Result<()> {
        self.ensure_parent_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;

        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(operation)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        file.unlock()?;

        tracing::debug!("Enqueued operation {}", operation.id());
        Ok(())
    }

    /// Read all queued operations, tolerating individually corrupt lines.
    pub fn load(&self) -> Result<Vec<OfflineOperation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let reader = BufReader::new(&file);
        let mut operations = Vec::new();
        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OfflineOperation>(&line) {
                Ok(operation) => operations.push(operation),
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse queued operation at line {}: {}",
                        line_num + 1,
                        e
                    );
                }
            }
        }

        file.unlock()?;
        Ok(operations)
    }

    /// Atomically replace the queue contents (used after a sync pass has
    /// confirmed which operations succeeded).
    pub fn replace(&self, operations: &[OfflineOperation]) -> Result<()> {
        self.ensure_parent_dir()?;

        let parent = self.path.parent().ok_or_else(|| {
            Error::State("queue path missing parent directory".to_string())
        })?;
        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            for operation in operations {
                let line = serde_json::to_string(operation)?;
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Rewrote queue with {} operations", operations.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 18, 0, 0).unwrap()
    }

    fn sample_session(session_id: SessionId) -> SessionRecord {
        SessionRecord {
            session_id,
            template_id: "push_day".into(),
            started_at: fixed_now(),
            finalized: false,
        }
    }

    #[test]
    fn test_operation_ids_are_deterministic_and_sequential() {
        let session_id = SessionId::new();
        let mut a = OperationFactory::new(session_id);
        let mut b = OperationFactory::new(session_id);

        let op_a = a.create_session(sample_session(session_id), fixed_now());
        let op_b = b.create_session(sample_session(session_id), fixed_now());
        assert_eq!(op_a.id(), op_b.id());

        let next = a.finalize_session(
            SessionSummaryRecord {
                session_id,
                ended_at: fixed_now(),
                duration_seconds: 1800,
                total_sets: 12,
                total_volume: 3000.0,
            },
            fixed_now(),
        );
        assert_ne!(op_a.id(), next.id());
        assert!(next.id().0.starts_with(&session_id.to_string()));
    }

    #[test]
    fn test_append_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(temp_dir.path().join("queue.jsonl"));

        let session_id = SessionId::new();
        let mut factory = OperationFactory::new(session_id);
        let op = factory.create_session(sample_session(session_id), fixed_now());
        queue.append(&op).unwrap();

        let loaded = queue.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], op);
    }

    #[test]
    fn test_load_missing_queue_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(temp_dir.path().join("nonexistent.jsonl"));
        assert!(queue.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("queue.jsonl");
        let queue = OfflineQueue::new(&path);

        let session_id = SessionId::new();
        let mut factory = OperationFactory::new(session_id);
        queue
            .append(&factory.create_session(sample_session(session_id), fixed_now()))
            .unwrap();

        // Inject a corrupt line between valid ones
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{ not json").unwrap();
        }
        queue
            .append(&factory.finalize_session(
                SessionSummaryRecord {
                    session_id,
                    ended_at: fixed_now(),
                    duration_seconds: 60,
                    total_sets: 1,
                    total_volume: 100.0,
                },
                fixed_now(),
            ))
            .unwrap();

        let loaded = queue.load().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_replace_rewrites_queue() {
        let temp_dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(temp_dir.path().join("queue.jsonl"));

        let session_id = SessionId::new();
        let mut factory = OperationFactory::new(session_id);
        let first = factory.create_session(sample_session(session_id), fixed_now());
        let second = factory.upsert_item(
            ItemRecord {
                item_id: ItemId::new(),
                session_id,
                exercise_id: "bench_press".into(),
                status: ExerciseStatus::Pending,
                skip_reason: None,
            },
            fixed_now(),
        );
        queue.append(&first).unwrap();
        queue.append(&second).unwrap();

        queue.replace(std::slice::from_ref(&second)).unwrap();
        let loaded = queue.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id(), second.id());
    }

    #[test]
    fn test_replace_with_empty_clears_queue() {
        let temp_dir = tempfile::tempdir().unwrap();
        let queue = OfflineQueue::new(temp_dir.path().join("queue.jsonl"));

        let session_id = SessionId::new();
        let mut factory = OperationFactory::new(session_id);
        queue
            .append(&factory.create_session(sample_session(session_id), fixed_now()))
            .unwrap();
        queue.replace(&[]).unwrap();
        assert!(queue.load().unwrap().is_empty());
    }
}
