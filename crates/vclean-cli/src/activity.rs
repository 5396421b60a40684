//! Local activity log.
//!
//! One record per submitted job, persisted as a JSON file next to the user,
//! bounded to the 50 most recent entries, newest first. The log is a
//! collaborator of the tracker: an entry is appended when a submission
//! succeeds and the newest entry is rewritten when the job ends.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use vclean_models::Job;

/// Maximum number of retained entries.
pub const MAX_ENTRIES: usize = 50;

/// Status recorded right after a successful upload.
pub const STATUS_UPLOADED: &str = "UPLOADED";

/// One processed-video record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub filename: String,
    pub file_size_bytes: u64,
    pub params: String,
    pub status: String,
    pub duration_ms: u64,
}

impl ActivityEntry {
    /// Entry for a freshly submitted job.
    pub fn from_job(job: &Job) -> Self {
        Self {
            timestamp: Utc::now(),
            user: job.params.user_id.clone(),
            filename: job.file_name.clone(),
            file_size_bytes: job.file_size_bytes,
            params: job.params.to_string(),
            status: STATUS_UPLOADED.to_string(),
            duration_ms: 0,
        }
    }
}

/// File-backed, bounded activity log.
pub struct ActivityLog {
    path: PathBuf,
    entries: Vec<ActivityEntry>,
}

impl ActivityLog {
    /// Load the log at `path`, starting empty when the file is missing.
    /// An unreadable or corrupt file is discarded with a warning rather
    /// than failing the command that wanted to log.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Vec<ActivityEntry>>(&text) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "activity log unreadable, starting fresh");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, entries }
    }

    /// Load from `VCLEAN_ACTIVITY_LOG`, defaulting to `vclean-activity.json`
    /// in the working directory.
    pub fn load_default() -> Self {
        let path = std::env::var("VCLEAN_ACTIVITY_LOG")
            .unwrap_or_else(|_| "vclean-activity.json".to_string());
        Self::load(path)
    }

    /// Prepend an entry, trimming to [`MAX_ENTRIES`], and persist.
    pub fn append(&mut self, entry: ActivityEntry) -> anyhow::Result<()> {
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_ENTRIES);
        self.save()
    }

    /// Rewrite the newest entry's outcome and persist. No-op on an empty log.
    pub fn finish_latest(&mut self, status: &str, duration_ms: u64) -> anyhow::Result<()> {
        match self.entries.first_mut() {
            Some(entry) => {
                entry.status = status.to_string();
                entry.duration_ms = duration_ms;
                self.save()
            }
            None => Ok(()),
        }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[ActivityEntry] {
        &self.entries
    }

    /// Path the log persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> anyhow::Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("writing activity log {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(filename: &str) -> ActivityEntry {
        ActivityEntry {
            timestamp: Utc::now(),
            user: "tester".to_string(),
            filename: filename.to_string(),
            file_size_bytes: 42,
            params: "epsilon=0.12".to_string(),
            status: STATUS_UPLOADED.to_string(),
            duration_ms: 0,
        }
    }

    #[test]
    fn append_keeps_newest_first_and_bounds_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        let mut log = ActivityLog::load(&path);

        for i in 0..60 {
            log.append(entry(&format!("clip-{i}.mp4"))).unwrap();
        }

        assert_eq!(log.entries().len(), MAX_ENTRIES);
        assert_eq!(log.entries()[0].filename, "clip-59.mp4");

        let reloaded = ActivityLog::load(&path);
        assert_eq!(reloaded.entries().len(), MAX_ENTRIES);
        assert_eq!(reloaded.entries()[0].filename, "clip-59.mp4");
    }

    #[test]
    fn finish_latest_rewrites_the_newest_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        let mut log = ActivityLog::load(&path);

        log.append(entry("old.mp4")).unwrap();
        log.append(entry("new.mp4")).unwrap();
        log.finish_latest("COMPLETED", 1234).unwrap();

        assert_eq!(log.entries()[0].filename, "new.mp4");
        assert_eq!(log.entries()[0].status, "COMPLETED");
        assert_eq!(log.entries()[0].duration_ms, 1234);
        assert_eq!(log.entries()[1].status, STATUS_UPLOADED);
    }

    #[test]
    fn corrupt_file_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = ActivityLog::load(&path);
        assert!(log.entries().is_empty());
    }

    #[test]
    fn finish_latest_on_empty_log_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = ActivityLog::load(dir.path().join("log.json"));
        log.finish_latest("COMPLETED", 10).unwrap();
        assert!(log.entries().is_empty());
    }
}
