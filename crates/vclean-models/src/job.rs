//! Job identity, lifecycle status and snapshot application.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::params::ProcessingParams;
use crate::snapshot::TaskSnapshot;

/// Unique identifier for a job, assigned by the processing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a server-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, waiting in the service queue
    #[default]
    Pending,
    /// Actively being processed
    Processing,
    /// Finished successfully; artifact available
    Completed,
    /// Finished with an error
    Failed,
    /// Stopped by the user
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    /// Check if this is a terminal state (no more transitions occur).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Parse a wire status string. Matching is strict: anything but the
    /// five exact lowercase values is an unknown status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of applying a snapshot to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The job entered a terminal status with this snapshot.
    pub became_terminal: bool,
}

/// One tracked processing job.
///
/// Created when a submission succeeds; destroyed only when the owner clears
/// it. At most one job is live at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Server-assigned id
    pub id: JobId,
    /// Lifecycle status
    pub status: JobStatus,
    /// Badge text; unknown remote statuses are shown verbatim, uppercased
    pub display_status: String,
    /// Derived progress percentage (0-100)
    pub progress_percent: u8,
    /// Total frames, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_total: Option<u64>,
    /// Frames processed so far, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_processed: Option<u64>,
    /// Last human-readable detail from the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Most recent processing log line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_log_message: Option<String>,
    /// Parameters the job was submitted with
    pub params: ProcessingParams,
    /// Name of the uploaded file
    pub file_name: String,
    /// Size of the uploaded file in bytes
    pub file_size_bytes: u64,
    /// Local submission timestamp, for duration accounting
    pub started_at: DateTime<Utc>,
    /// Elapsed time at the terminal transition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Job {
    /// Create a freshly submitted job in `Pending`.
    pub fn new(
        id: JobId,
        params: ProcessingParams,
        file_name: impl Into<String>,
        file_size_bytes: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            display_status: JobStatus::Pending.as_str().to_uppercase(),
            progress_percent: 0,
            frames_total: None,
            frames_processed: None,
            last_message: None,
            last_log_message: None,
            params,
            file_name: file_name.into(),
            file_size_bytes,
            started_at: now,
            duration_ms: None,
        }
    }

    /// Apply a remote snapshot, advancing the lifecycle.
    ///
    /// Terminal states are absorbing: once the job is terminal the snapshot
    /// is ignored entirely. A snapshot with an unrecognized status updates
    /// display fields only and never drives a transition.
    pub fn apply(&mut self, snapshot: &TaskSnapshot, now: DateTime<Utc>) -> ApplyOutcome {
        if self.status.is_terminal() {
            return ApplyOutcome {
                became_terminal: false,
            };
        }

        self.frames_total = snapshot.total_frames.or(self.frames_total);
        self.frames_processed = snapshot.processed_frames.or(self.frames_processed);
        if snapshot.message.is_some() {
            self.last_message = snapshot.message.clone();
        }
        if snapshot.last_log_message.is_some() {
            self.last_log_message = snapshot.last_log_message.clone();
        }

        let mut became_terminal = false;
        match snapshot.known_status() {
            Some(next) => {
                self.status = next;
                self.display_status = next.as_str().to_uppercase();
                if next.is_terminal() {
                    became_terminal = true;
                    self.duration_ms = Some(self.elapsed_ms(now));
                }
            }
            None => {
                self.display_status = snapshot.status.to_uppercase();
            }
        }

        self.progress_percent = if self.status == JobStatus::Completed {
            100
        } else {
            snapshot.normalized_progress()
        };

        ApplyOutcome { became_terminal }
    }

    /// Mark the job cancelled locally, before (and regardless of) the remote
    /// acknowledgment. No-op when already terminal.
    pub fn cancel_local(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Cancelled;
        self.display_status = JobStatus::Cancelled.as_str().to_uppercase();
        self.duration_ms = Some(self.elapsed_ms(now));
        true
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn elapsed_ms(&self, now: DateTime<Utc>) -> u64 {
        (now - self.started_at).num_milliseconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job() -> Job {
        Job::new(
            JobId::new("task-1"),
            ProcessingParams::default(),
            "clip.mp4",
            1024,
            Utc::now(),
        )
    }

    #[test]
    fn new_job_is_pending() {
        let job = test_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.display_status, "PENDING");
        assert_eq!(job.progress_percent, 0);
        assert!(!job.is_terminal());
    }

    #[test]
    fn processing_snapshot_updates_progress_from_frames() {
        let mut job = test_job();
        let snap = TaskSnapshot {
            total_frames: Some(200),
            processed_frames: Some(50),
            ..TaskSnapshot::with_status("processing")
        };

        let outcome = job.apply(&snap, Utc::now());
        assert!(!outcome.became_terminal);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress_percent, 25);
        assert_eq!(job.frames_total, Some(200));
    }

    #[test]
    fn completion_records_duration_and_forces_full_progress() {
        let mut job = test_job();
        job.started_at = Utc::now() - chrono::Duration::seconds(90);

        let outcome = job.apply(&TaskSnapshot::with_status("completed"), Utc::now());
        assert!(outcome.became_terminal);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress_percent, 100);
        assert!(job.duration_ms.unwrap() >= 90_000);
    }

    #[test]
    fn terminal_state_absorbs_later_snapshots() {
        let mut job = test_job();
        job.apply(&TaskSnapshot::with_status("failed"), Utc::now());
        assert_eq!(job.status, JobStatus::Failed);

        let outcome = job.apply(&TaskSnapshot::with_status("processing"), Utc::now());
        assert!(!outcome.became_terminal);
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn unknown_status_updates_display_only() {
        let mut job = test_job();
        job.apply(&TaskSnapshot::with_status("processing"), Utc::now());

        let snap = TaskSnapshot {
            progress: Some(0.6),
            ..TaskSnapshot::with_status("finalizing")
        };
        let outcome = job.apply(&snap, Utc::now());
        assert!(!outcome.became_terminal);
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.display_status, "FINALIZING");
        assert_eq!(job.progress_percent, 60);
    }

    #[test]
    fn failure_message_is_carried_over() {
        let mut job = test_job();
        let snap = TaskSnapshot {
            message: Some("codec mismatch".to_string()),
            ..TaskSnapshot::with_status("failed")
        };

        let outcome = job.apply(&snap, Utc::now());
        assert!(outcome.became_terminal);
        assert_eq!(job.last_message.as_deref(), Some("codec mismatch"));
        assert!(job.duration_ms.is_some());
    }

    #[test]
    fn local_cancel_is_terminal_and_idempotent() {
        let mut job = test_job();
        assert!(job.cancel_local(Utc::now()));
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.duration_ms.is_some());

        assert!(!job.cancel_local(Utc::now()));
    }

    #[test]
    fn status_parse_is_strict() {
        assert_eq!(JobStatus::parse("completed"), Some(JobStatus::Completed));
        assert_eq!(JobStatus::parse("Completed"), None);
        assert_eq!(JobStatus::parse("finalizing"), None);
    }

    #[test]
    fn differently_cased_status_is_display_only() {
        let mut job = test_job();
        job.apply(&TaskSnapshot::with_status("COMPLETED"), Utc::now());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.display_status, "COMPLETED");
    }
}
