//! Flat-file job journal.
//!
//! One JSON file per job under `<root>/history/`. Records accumulate
//! indefinitely; listing is newest-first. This is the backing for the
//! user-facing history surface; the core itself never reads it back
//! during a render.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::domain::StorageError;

/// Subdirectory holding job records.
pub const HISTORY_DIR: &str = "history";

/// One journal entry per render job, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique job key (also the record's filename stem).
    pub job_key: String,

    /// The prompt that started the job.
    pub prompt: String,

    /// Persisted script, if the job got that far.
    pub script_path: Option<PathBuf>,

    /// Rendered image, if the job completed.
    pub artifact_path: Option<PathBuf>,

    /// Hex SHA-256 of the persisted script text.
    pub script_digest: Option<String>,

    /// Whether the pipeline completed end to end.
    pub success: bool,

    /// Error display, present on failure.
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Record for a job that completed end to end.
    pub fn succeeded(
        job_key: &str,
        prompt: &str,
        script_path: PathBuf,
        artifact_path: PathBuf,
        script_digest: String,
    ) -> Self {
        Self {
            job_key: job_key.to_string(),
            prompt: prompt.to_string(),
            script_path: Some(script_path),
            artifact_path: Some(artifact_path),
            script_digest: Some(script_digest),
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Record for a job that failed at any stage.
    pub fn failed(job_key: &str, prompt: &str, script_path: Option<PathBuf>, error: &str) -> Self {
        Self {
            job_key: job_key.to_string(),
            prompt: prompt.to_string(),
            script_path,
            artifact_path: None,
            script_digest: None,
            success: false,
            error: Some(error.to_string()),
            created_at: Utc::now(),
        }
    }
}

/// Append-only store of [`JobRecord`]s, one file per job.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Create a history store under `root`, creating the directory if
    /// needed (idempotent).
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = root.as_ref().join(HISTORY_DIR);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Write one record. Job keys are unique, so this never overwrites an
    /// earlier job.
    pub fn append(&self, record: &JobRecord) -> Result<(), StorageError> {
        let path = self.dir.join(format!("{}.json", record.job_key));
        let body = serde_json::to_vec_pretty(record)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&body)?;
        tmp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    /// Fetch one record by job key.
    pub fn get(&self, job_key: &str) -> Result<Option<JobRecord>, StorageError> {
        let path = self.dir.join(format!("{job_key}.json"));
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// All records, newest first. Unreadable entries are skipped.
    pub fn list(&self) -> Result<Vec<JobRecord>, StorageError> {
        let mut records: Vec<JobRecord> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| {
                let bytes = fs::read(entry.path()).ok()?;
                serde_json::from_slice(&bytes).ok()
            })
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_append_and_get_roundtrip() {
        let (_dir, store) = make_store();
        let record = JobRecord::succeeded(
            "cube-ab12cd34",
            "a red cube at the origin",
            PathBuf::from("/ws/scripts/cube-ab12cd34.py"),
            PathBuf::from("/ws/renders/cube-ab12cd34.png"),
            "deadbeef".to_string(),
        );

        store.append(&record).unwrap();
        let back = store.get("cube-ab12cd34").unwrap().unwrap();
        assert_eq!(back, record);
        assert!(back.success);
    }

    #[test]
    fn test_get_unknown_key_is_none() {
        let (_dir, store) = make_store();
        assert!(store.get("never-seen").unwrap().is_none());
    }

    #[test]
    fn test_failed_record_has_no_artifact() {
        let (_dir, store) = make_store();
        let record = JobRecord::failed(
            "cube-ff00aa11",
            "a cube",
            None,
            "script contains forbidden pattern \"import os\"",
        );
        store.append(&record).unwrap();

        let back = store.get("cube-ff00aa11").unwrap().unwrap();
        assert!(!back.success);
        assert!(back.artifact_path.is_none());
        assert!(back.error.unwrap().contains("import os"));
    }

    #[test]
    fn test_list_newest_first() {
        let (_dir, store) = make_store();

        let mut older = JobRecord::failed("old-11111111", "first", None, "boom");
        older.created_at = Utc::now() - chrono::Duration::seconds(60);
        let newer = JobRecord::failed("new-22222222", "second", None, "boom");

        store.append(&older).unwrap();
        store.append(&newer).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].job_key, "new-22222222");
        assert_eq!(records[1].job_key, "old-11111111");
    }

    #[test]
    fn test_list_skips_non_record_files() {
        let (dir, store) = make_store();
        fs::write(dir.path().join(HISTORY_DIR).join("junk.txt"), b"noise").unwrap();
        fs::write(dir.path().join(HISTORY_DIR).join("bad.json"), b"{").unwrap();

        store
            .append(&JobRecord::failed("ok-33333333", "p", None, "e"))
            .unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_key, "ok-33333333");
    }
}
