//! Job lifecycle orchestration.
//!
//! [`JobTracker`] owns the single tracked [`Job`] and its poll session. All
//! mutation funnels through the operations here; the scheduler and any UI
//! layer never touch the state directly.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use vclean_models::{validate_video_file, Job, JobId, JobStatus, ProcessingParams, ValidationError};
use vclean_transport::ProgressFn;

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::events::{ErrorKind, TrackerEvent};
use crate::scheduler::{self, SchedulerState, SessionState};
use crate::transport::JobApi;

/// Mutable tracker state. One job, one session, guarded by one lock.
pub(crate) struct TrackerState {
    pub(crate) job: Option<Job>,
    pub(crate) session: SessionState,
    pub(crate) generation: u64,
    pub(crate) submitting: bool,
}

pub(crate) struct Inner {
    state: Mutex<TrackerState>,
    pub(crate) events: broadcast::Sender<TrackerEvent>,
    pub(crate) api: Arc<dyn JobApi>,
    pub(crate) poll_interval: Duration,
}

impl Inner {
    pub(crate) fn new(api: Arc<dyn JobApi>, config: TrackerConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(config.event_capacity);
        Arc::new(Self {
            state: Mutex::new(TrackerState {
                job: None,
                session: SessionState::Idle,
                generation: 0,
                submitting: false,
            }),
            events,
            api,
            poll_interval: config.poll_interval,
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Tracks the lifecycle of one processing job at a time.
///
/// Cloning the tracker is cheap; clones share the same job and session.
#[derive(Clone)]
pub struct JobTracker {
    inner: Arc<Inner>,
}

impl JobTracker {
    /// Create a tracker on top of any [`JobApi`] implementation.
    pub fn new(api: Arc<dyn JobApi>, config: TrackerConfig) -> Self {
        Self {
            inner: Inner::new(api, config),
        }
    }

    /// Subscribe to boundary events.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the tracked job, if any.
    pub fn current_job(&self) -> Option<Job> {
        self.inner.lock().job.clone()
    }

    /// Current scheduler state.
    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.lock().session.view()
    }

    /// Submit a video for processing and start polling its status.
    ///
    /// Fails with [`TrackerError::AlreadyActive`] while a job is tracked
    /// (terminal or not; `clear` frees the slot) or another submission is in
    /// flight. Parameters and the file are validated before any network
    /// call; on any failure the tracker is back in its empty state.
    pub async fn submit_job(
        &self,
        path: impl AsRef<Path>,
        params: ProcessingParams,
    ) -> TrackerResult<JobId> {
        let path = path.as_ref();
        params.validate()?;

        {
            let mut state = self.inner.lock();
            if state.job.is_some() || state.submitting {
                return Err(TrackerError::AlreadyActive);
            }
            state.submitting = true;
        }

        match self.perform_submit(path, &params).await {
            Ok((job_id, file_name, file_size)) => {
                let job = {
                    let mut state = self.inner.lock();
                    state.submitting = false;
                    let job = Job::new(job_id.clone(), params, file_name, file_size, Utc::now());
                    state.job = Some(job.clone());
                    job
                };
                info!(job_id = %job_id, file = %job.file_name, "job submitted");
                let _ = self.inner.events.send(TrackerEvent::StatusChanged { job });
                scheduler::start(&self.inner, job_id.clone());
                Ok(job_id)
            }
            Err(err) => {
                self.inner.lock().submitting = false;
                warn!(error = %err, "submission failed");
                let _ = self.inner.events.send(TrackerEvent::Error {
                    kind: ErrorKind::Upload,
                    detail: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn perform_submit(
        &self,
        path: &Path,
        params: &ProcessingParams,
    ) -> TrackerResult<(JobId, String, u64)> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ValidationError::FileNotFound(path.display().to_string()))?;
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| ValidationError::FileNotFound(path.display().to_string()))?;
        validate_video_file(&file_name, metadata.len())?;

        let events = self.inner.events.clone();
        let on_progress: ProgressFn = Arc::new(move |percent| {
            let _ = events.send(TrackerEvent::UploadProgress { percent });
        });

        let job_id = self.inner.api.submit(path, params, on_progress).await?;
        Ok((job_id, file_name, metadata.len()))
    }

    /// Cancel the active job.
    ///
    /// Polling stops and the job is marked `Cancelled` before the remote
    /// call is issued; the acknowledgment never gates the local stop. A
    /// failing remote cancel is logged and surfaced as an event, nothing
    /// more.
    pub fn cancel_job(&self) -> TrackerResult<()> {
        let job = {
            let mut state = self.inner.lock();
            let mut job = match state.job.take() {
                Some(job) if !job.is_terminal() => job,
                other => {
                    state.job = other;
                    return Err(TrackerError::NotReady);
                }
            };
            state.release_session();
            job.cancel_local(Utc::now());
            state.job = Some(job.clone());
            job
        };

        info!(job_id = %job.id, "job cancelled locally");
        let duration_ms = job.duration_ms.unwrap_or(0);
        let _ = self
            .inner
            .events
            .send(TrackerEvent::StatusChanged { job: job.clone() });
        let _ = self.inner.events.send(TrackerEvent::JobTerminal {
            job: job.clone(),
            duration_ms,
        });

        let api = Arc::clone(&self.inner.api);
        let events = self.inner.events.clone();
        let job_id = job.id;
        tokio::spawn(async move {
            match api.cancel(&job_id).await {
                Ok(()) => debug!(job_id = %job_id, "cancel acknowledged"),
                Err(err) => {
                    warn!(job_id = %job_id, error = %err, "cancel request failed; local state already stopped");
                    let _ = events.send(TrackerEvent::Error {
                        kind: ErrorKind::Cancel,
                        detail: err.to_string(),
                    });
                }
            }
        });

        Ok(())
    }

    /// Download the artifact of the completed job.
    pub async fn fetch_artifact(&self) -> TrackerResult<Vec<u8>> {
        let job_id = {
            let state = self.inner.lock();
            match &state.job {
                Some(job) if job.status == JobStatus::Completed => job.id.clone(),
                _ => return Err(TrackerError::NotReady),
            }
        };
        Ok(self.inner.api.fetch_artifact(&job_id).await?)
    }

    /// Release the job and any poll session unconditionally, returning the
    /// tracker to its empty initial state. A response already in flight can
    /// no longer touch anything.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.release_session();
        state.generation += 1;
        if let Some(job) = state.job.take() {
            debug!(job_id = %job.id, "job cleared");
        }
    }

    /// React to host visibility: hidden parks the timer, visible re-arms it
    /// while a non-terminal job is tracked.
    pub fn on_visibility_change(&self, hidden: bool) {
        if hidden {
            scheduler::suspend(&self.inner);
        } else {
            scheduler::resume(&self.inner);
        }
    }
}
