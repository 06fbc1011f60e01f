//! File-backed persistence collaborator.
//!
//! `FileStore` keeps sessions, items, and finalization summaries in an
//! atomically-replaced JSON document, and appends every set log to a CSV
//! archive (the same archive the history loader reads). Insert paths raise
//! `Error::DuplicateKey` on an existing identifier so the sync layer can
//! reclassify retries as success.

use crate::error::{Error, Result};
use crate::sync::PersistenceStore;
use crate::types::*;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The JSON document holding everything except set logs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    sessions: BTreeMap<SessionId, SessionRecord>,
    #[serde(default)]
    items: BTreeMap<ItemId, ItemRecord>,
    #[serde(default)]
    summaries: BTreeMap<SessionId, SessionSummaryRecord>,
}

/// CSV row format for the set-log archive.
#[derive(Debug, Serialize)]
struct CsvRow {
    id: String,
    session_id: String,
    item_id: String,
    exercise_id: String,
    set_index: u32,
    weight: f64,
    reps: u32,
    rpe: Option<f64>,
    planned_weight: f64,
    planned_reps: u32,
    adjustment_applied: Option<String>,
    logged_at: String,
}

impl From<&SetLogEntry> for CsvRow {
    fn from(entry: &SetLogEntry) -> Self {
        CsvRow {
            id: entry.id.to_string(),
            session_id: entry.session_id.to_string(),
            item_id: entry.item_id.to_string(),
            exercise_id: entry.exercise_id.clone(),
            set_index: entry.set_index,
            weight: entry.weight,
            reps: entry.reps,
            rpe: entry.rpe,
            planned_weight: entry.planned_weight,
            planned_reps: entry.planned_reps,
            adjustment_applied: entry.adjustment_applied.clone(),
            logged_at: entry.logged_at.to_rfc3339(),
        }
    }
}

/// Just the id column, for existence prechecks.
#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

/// File-backed store rooted at a data directory.
pub struct FileStore {
    doc_path: PathBuf,
    csv_path: PathBuf,
    doc: StoreDocument,
}

impl FileStore {
    /// Open (or initialize) the store under a data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let doc_path = data_dir.join("sessions.json");
        let csv_path = data_dir.join("set_logs.csv");
        let doc = Self::load_document(&doc_path)?;
        Ok(Self {
            doc_path,
            csv_path,
            doc,
        })
    }

    /// Path of the CSV set-log archive (read by the history loader).
    pub fn set_log_path(&self) -> &Path {
        &self.csv_path
    }

    fn load_document(path: &Path) -> Result<StoreDocument> {
        if !path.exists() {
            return Ok(StoreDocument::default());
        }
        let file = File::open(path)?;
        file.lock_shared()?;
        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        reader.read_to_string(&mut contents)?;
        file.unlock()?;

        match serde_json::from_str(&contents) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse store document {:?}: {}. Starting empty.",
                    path,
                    e
                );
                Ok(StoreDocument::default())
            }
        }
    }

    /// Atomically persist the JSON document.
    fn save_document(&self) -> Result<()> {
        if let Some(parent) = self.doc_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let parent = self.doc_path.parent().ok_or_else(|| {
            Error::State("store path missing parent directory".to_string())
        })?;
        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(&self.doc)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.doc_path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn append_set_log_row(&self, entry: &SetLogEntry) -> Result<()> {
        if let Some(parent) = self.csv_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.csv_path)?;
        file.lock_exclusive()?;

        let needs_headers = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_headers)
            .from_writer(&file);
        writer.serialize(CsvRow::from(entry))?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;
        Ok(())
    }
}

impl PersistenceStore for FileStore {
    fn session_exists(&self, session_id: SessionId) -> Result<bool> {
        Ok(self.doc.sessions.contains_key(&session_id))
    }

    fn create_session(&mut self, record: &SessionRecord) -> Result<()> {
        if self.doc.sessions.contains_key(&record.session_id) {
            return Err(Error::DuplicateKey(record.session_id.to_string()));
        }
        self.doc.sessions.insert(record.session_id, record.clone());
        self.save_document()?;
        tracing::debug!("Created session {}", record.session_id);
        Ok(())
    }

    fn upsert_item(&mut self, item: &ItemRecord) -> Result<()> {
        self.doc.items.insert(item.item_id, item.clone());
        self.save_document()?;
        Ok(())
    }

    fn set_log_exists(&self, id: &SetLogId) -> Result<bool> {
        if !self.csv_path.exists() {
            return Ok(false);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.csv_path)?;
        for row in reader.deserialize::<IdRow>() {
            match row {
                Ok(row) if row.id == id.0 => return Ok(true),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable set-log row: {}", e);
                }
            }
        }
        Ok(false)
    }

    fn insert_set_log(&mut self, entry: &SetLogEntry) -> Result<()> {
        if self.set_log_exists(&entry.id)? {
            return Err(Error::DuplicateKey(entry.id.to_string()));
        }
        self.append_set_log_row(entry)?;
        tracing::debug!("Logged set {}", entry.id);
        Ok(())
    }

    fn finalize_session(&mut self, summary: &SessionSummaryRecord) -> Result<()> {
        if let Some(session) = self.doc.sessions.get_mut(&summary.session_id) {
            session.finalized = true;
        }
        self.doc.summaries.insert(summary.session_id, summary.clone());
        self.save_document()?;
        tracing::debug!("Finalized session {}", summary.session_id);
        Ok(())
    }
}
