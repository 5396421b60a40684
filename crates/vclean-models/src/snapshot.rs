//! Remote status snapshots.
//!
//! A [`TaskSnapshot`] is one `GET /api/task/{id}` response body's `task`
//! object. The service reports progress in whichever unit the processing
//! stage happens to have at hand (a 0-1 fraction, a 0-100 percentage, or
//! frame counters), so normalization lives here rather than in the UI.

use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// Snapshot of a remote task, as returned by the status endpoint.
///
/// Every field except `status` is optional; the service omits fields the
/// current processing stage has no value for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Raw status string
    pub status: String,
    /// Progress as reported (fraction or percentage, see [`TaskSnapshot::normalized_progress`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Total frames in the input video
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    /// Frames processed so far
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_frames: Option<u64>,
    /// Human-readable detail (error message on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Most recent processing log line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_log_message: Option<String>,
    /// Parameter echoes; informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub every_n_frames: Option<u32>,
}

impl TaskSnapshot {
    /// Minimal snapshot with only a status string.
    pub fn with_status(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            progress: None,
            total_frames: None,
            processed_frames: None,
            message: None,
            last_log_message: None,
            epsilon: None,
            video_strength: None,
            audio_level: None,
            every_n_frames: None,
        }
    }

    /// Parse the status string into a known lifecycle status.
    ///
    /// Returns `None` for anything outside the five known values; such
    /// snapshots carry display information but never drive a transition.
    pub fn known_status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }

    /// Resolve the reported progress into a 0-100 percentage.
    ///
    /// Frame counters win when both are present and `total_frames > 0`
    /// (a missing `processed_frames` counts as 0). Otherwise the raw
    /// `progress` value is interpreted by magnitude: values above 1 are
    /// already percentages, values at or below 1 are fractions. The result
    /// is clamped to 0-100; an absent value is 0.
    pub fn normalized_progress(&self) -> u8 {
        if let Some(total) = self.total_frames {
            if total > 0 {
                let done = self.processed_frames.unwrap_or(0);
                let percent = (done as f64 / total as f64) * 100.0;
                return percent.round().clamp(0.0, 100.0) as u8;
            }
        }

        match self.progress {
            Some(value) if value > 1.0 => value.round().clamp(0.0, 100.0) as u8,
            Some(value) => (value * 100.0).round().clamp(0.0, 100.0) as u8,
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(progress: Option<f64>, total: Option<u64>, done: Option<u64>) -> TaskSnapshot {
        TaskSnapshot {
            progress,
            total_frames: total,
            processed_frames: done,
            ..TaskSnapshot::with_status("processing")
        }
    }

    #[test]
    fn fraction_scales_to_percentage() {
        assert_eq!(snapshot(Some(0.42), None, None).normalized_progress(), 42);
    }

    #[test]
    fn percentage_passes_through() {
        assert_eq!(snapshot(Some(83.0), None, None).normalized_progress(), 83);
    }

    #[test]
    fn overflow_clamps_to_100() {
        assert_eq!(snapshot(Some(150.0), None, None).normalized_progress(), 100);
    }

    #[test]
    fn frame_counters_override_raw_progress() {
        assert_eq!(
            snapshot(Some(0.99), Some(120), Some(30)).normalized_progress(),
            25
        );
    }

    #[test]
    fn missing_processed_frames_counts_as_zero() {
        assert_eq!(snapshot(None, Some(120), None).normalized_progress(), 0);
    }

    #[test]
    fn zero_total_frames_falls_back_to_raw_progress() {
        assert_eq!(snapshot(Some(0.5), Some(0), Some(10)).normalized_progress(), 50);
    }

    #[test]
    fn absent_progress_is_zero() {
        assert_eq!(snapshot(None, None, None).normalized_progress(), 0);
    }

    #[test]
    fn negative_progress_clamps_to_zero() {
        assert_eq!(snapshot(Some(-0.2), None, None).normalized_progress(), 0);
    }

    #[test]
    fn deserializes_sparse_task_object() {
        let snap: TaskSnapshot =
            serde_json::from_str(r#"{"status": "pending"}"#).expect("deserialize");
        assert_eq!(snap.status, "pending");
        assert_eq!(snap.normalized_progress(), 0);
        assert_eq!(snap.known_status(), Some(JobStatus::Pending));
    }
}
