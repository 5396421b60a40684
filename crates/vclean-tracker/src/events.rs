//! Boundary events emitted to collaborators (UI, activity log).

use std::fmt;

use vclean_models::Job;

/// Which operation an [`TrackerEvent::Error`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Submission/upload failed; the tracker is back to its empty state.
    Upload,
    /// A status poll failed; polling stopped (it resumes with visibility).
    Poll,
    /// The remote cancel request failed; local state has already moved on.
    Cancel,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Upload => "upload",
            ErrorKind::Poll => "poll",
            ErrorKind::Cancel => "cancel",
        };
        write!(f, "{name}")
    }
}

/// Events broadcast by the tracker.
///
/// Consumers subscribe via [`crate::JobTracker::subscribe`]; a lagging or
/// absent consumer never blocks the engine.
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// Upload body progress, 0-100.
    UploadProgress { percent: u8 },
    /// The tracked job changed (status, progress or messages).
    StatusChanged { job: Job },
    /// The job reached a terminal status.
    JobTerminal { job: Job, duration_ms: u64 },
    /// A non-fatal failure surfaced to the user.
    Error { kind: ErrorKind, detail: String },
}
