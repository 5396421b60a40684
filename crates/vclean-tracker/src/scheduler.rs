//! Poll scheduling.
//!
//! One recurring timer drives status refresh for the tracked job. The
//! session is an explicit state machine (`Idle | Armed | Suspended`) guarded
//! by a generation counter: every arm bumps the generation, and a response
//! is applied only while its session is still the armed one. Stopping or
//! suspending does not wait for an in-flight request; the generation check
//! guarantees a late response is discarded instead of applied.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use vclean_models::{JobId, TaskSnapshot};
use vclean_transport::TransportError;

use crate::events::{ErrorKind, TrackerEvent};
use crate::tracker::{Inner, TrackerState};

/// Externally observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No session; nothing is polled.
    Idle,
    /// A recurring timer is live.
    Armed,
    /// A session exists but its timer is parked (host hidden).
    Suspended,
}

/// The poll session resource. At most one timer is armed at any instant.
#[derive(Debug)]
pub(crate) enum SessionState {
    Idle,
    Armed {
        job_id: JobId,
        generation: u64,
        handle: JoinHandle<()>,
    },
    Suspended {
        job_id: JobId,
    },
}

impl SessionState {
    pub(crate) fn view(&self) -> SchedulerState {
        match self {
            SessionState::Idle => SchedulerState::Idle,
            SessionState::Armed { .. } => SchedulerState::Armed,
            SessionState::Suspended { .. } => SchedulerState::Suspended,
        }
    }
}

impl TrackerState {
    /// Abort any armed timer and return the session to `Idle`.
    pub(crate) fn release_session(&mut self) {
        if let SessionState::Armed { handle, .. } =
            std::mem::replace(&mut self.session, SessionState::Idle)
        {
            handle.abort();
        }
    }

    /// Whether `generation` still names the armed session for `job_id`.
    fn session_is(&self, job_id: &JobId, generation: u64) -> bool {
        matches!(
            &self.session,
            SessionState::Armed {
                job_id: armed_id,
                generation: armed_generation,
                ..
            } if armed_id == job_id && *armed_generation == generation
        )
    }
}

/// Result of handling one fetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    Continue,
    SessionOver,
}

/// Arm polling for `job_id`. No-op while a timer is already armed.
pub(crate) fn start(inner: &Arc<Inner>, job_id: JobId) {
    let mut state = inner.lock();
    if matches!(state.session, SessionState::Armed { .. }) {
        return;
    }
    arm_locked(inner, &mut state, job_id);
}

/// Park the timer, keeping the session's target job. Idempotent.
pub(crate) fn suspend(inner: &Inner) {
    let mut state = inner.lock();
    let current = std::mem::replace(&mut state.session, SessionState::Idle);
    state.session = match current {
        SessionState::Armed { job_id, handle, .. } => {
            handle.abort();
            debug!(job_id = %job_id, "polling suspended");
            SessionState::Suspended { job_id }
        }
        other => other,
    };
}

/// Re-arm polling if the tracker still holds an active job. Idempotent;
/// a no-op with no job, a terminal job, or an already armed timer.
pub(crate) fn resume(inner: &Arc<Inner>) {
    let mut state = inner.lock();
    if matches!(state.session, SessionState::Armed { .. }) {
        return;
    }
    let job_id = match &state.job {
        Some(job) if !job.is_terminal() => job.id.clone(),
        _ => return,
    };
    debug!(job_id = %job_id, "polling resumed");
    arm_locked(inner, &mut state, job_id);
}

fn arm_locked(inner: &Arc<Inner>, state: &mut TrackerState, job_id: JobId) {
    state.generation += 1;
    let generation = state.generation;
    let handle = tokio::spawn(poll_loop(Arc::clone(inner), job_id.clone(), generation));
    state.session = SessionState::Armed {
        job_id,
        generation,
        handle,
    };
}

impl Inner {
    /// Tick guard: true when the session is still armed for this job and the
    /// job is still active. Disarms the session otherwise, so no request is
    /// issued for a job the orchestrator has let go of.
    pub(crate) fn precheck_tick(&self, job_id: &JobId, generation: u64) -> bool {
        let mut state = self.lock();
        if !state.session_is(job_id, generation) {
            return false;
        }
        match &state.job {
            Some(job) if &job.id == job_id && !job.is_terminal() => true,
            _ => {
                state.session = SessionState::Idle;
                debug!(job_id = %job_id, "job no longer active, polling stopped");
                false
            }
        }
    }

    /// Apply a fetched snapshot, rejecting it when the session it belongs to
    /// has been released or replaced in the meantime.
    pub(crate) fn apply_snapshot(
        &self,
        job_id: &JobId,
        generation: u64,
        snapshot: TaskSnapshot,
    ) -> TickOutcome {
        let (job, became_terminal) = {
            let mut state = self.lock();
            if !state.session_is(job_id, generation) {
                debug!(job_id = %job_id, "discarding stale status response");
                return TickOutcome::SessionOver;
            }
            let job = match state.job.as_mut() {
                Some(job) if &job.id == job_id => job,
                _ => {
                    state.session = SessionState::Idle;
                    return TickOutcome::SessionOver;
                }
            };
            let outcome = job.apply(&snapshot, Utc::now());
            let job = job.clone();
            if outcome.became_terminal {
                state.session = SessionState::Idle;
            }
            (job, outcome.became_terminal)
        };

        let _ = self.events.send(TrackerEvent::StatusChanged { job: job.clone() });

        if became_terminal {
            info!(job_id = %job_id, status = %job.status, "job reached terminal status");
            let duration_ms = job.duration_ms.unwrap_or(0);
            let _ = self
                .events
                .send(TrackerEvent::JobTerminal { job, duration_ms });
            TickOutcome::SessionOver
        } else {
            TickOutcome::Continue
        }
    }

    /// End the session after a failed poll. A single failure is
    /// session-ending; the user resumes explicitly (reopening the view).
    pub(crate) fn fail_session(&self, job_id: &JobId, generation: u64, err: TransportError) {
        {
            let mut state = self.lock();
            if !state.session_is(job_id, generation) {
                return;
            }
            state.session = SessionState::Idle;
        }
        warn!(job_id = %job_id, error = %err, "status poll failed, polling stopped");
        let _ = self.events.send(TrackerEvent::Error {
            kind: ErrorKind::Poll,
            detail: err.to_string(),
        });
    }
}

/// The armed timer. Tick, check liveness, fetch, apply, repeat: the next
/// request is never issued before the previous response has been handled,
/// so snapshots are applied strictly in issuance order.
async fn poll_loop(inner: Arc<Inner>, job_id: JobId, generation: u64) {
    let mut ticker = tokio::time::interval(inner.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        if !inner.precheck_tick(&job_id, generation) {
            return;
        }

        match inner.api.fetch_status(&job_id).await {
            Ok(snapshot) => {
                if inner.apply_snapshot(&job_id, generation, snapshot) == TickOutcome::SessionOver {
                    return;
                }
            }
            Err(err) => {
                inner.fail_session(&job_id, generation, err);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use async_trait::async_trait;

    use vclean_models::{Job, JobStatus, ProcessingParams};
    use vclean_transport::{ProgressFn, TransportResult};

    use super::*;
    use crate::config::TrackerConfig;
    use crate::transport::JobApi;

    struct NullApi;

    #[async_trait]
    impl JobApi for NullApi {
        async fn submit(
            &self,
            _path: &Path,
            _params: &ProcessingParams,
            _on_progress: ProgressFn,
        ) -> TransportResult<JobId> {
            unreachable!("not exercised")
        }

        async fn fetch_status(&self, _job_id: &JobId) -> TransportResult<TaskSnapshot> {
            unreachable!("not exercised")
        }

        async fn cancel(&self, _job_id: &JobId) -> TransportResult<()> {
            unreachable!("not exercised")
        }

        async fn fetch_artifact(&self, _job_id: &JobId) -> TransportResult<Vec<u8>> {
            unreachable!("not exercised")
        }
    }

    fn armed_inner(job_id: &JobId, generation: u64) -> Arc<Inner> {
        let inner = Inner::new(Arc::new(NullApi), TrackerConfig::default());
        {
            let mut state = inner.lock();
            state.job = Some(Job::new(
                job_id.clone(),
                ProcessingParams::default(),
                "clip.mp4",
                1024,
                Utc::now(),
            ));
            state.generation = generation;
            state.session = SessionState::Armed {
                job_id: job_id.clone(),
                generation,
                handle: tokio::spawn(async {}),
            };
        }
        inner
    }

    #[tokio::test]
    async fn snapshot_for_stale_generation_is_discarded() {
        let job_id = JobId::new("task-1");
        let inner = armed_inner(&job_id, 5);

        let outcome =
            inner.apply_snapshot(&job_id, 4, TaskSnapshot::with_status("completed"));
        assert_eq!(outcome, TickOutcome::SessionOver);

        let state = inner.lock();
        let job = state.job.as_ref().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn snapshot_for_live_generation_is_applied() {
        let job_id = JobId::new("task-1");
        let inner = armed_inner(&job_id, 5);

        let outcome =
            inner.apply_snapshot(&job_id, 5, TaskSnapshot::with_status("processing"));
        assert_eq!(outcome, TickOutcome::Continue);

        let state = inner.lock();
        assert_eq!(state.job.as_ref().unwrap().status, JobStatus::Processing);
        assert!(matches!(state.session, SessionState::Armed { .. }));
    }

    #[tokio::test]
    async fn terminal_snapshot_releases_the_session() {
        let job_id = JobId::new("task-1");
        let inner = armed_inner(&job_id, 5);

        let outcome =
            inner.apply_snapshot(&job_id, 5, TaskSnapshot::with_status("completed"));
        assert_eq!(outcome, TickOutcome::SessionOver);

        let state = inner.lock();
        assert_eq!(state.session.view(), SchedulerState::Idle);
        assert_eq!(state.job.as_ref().unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn precheck_disarms_when_job_is_gone() {
        let job_id = JobId::new("task-1");
        let inner = armed_inner(&job_id, 5);
        inner.lock().job = None;

        assert!(!inner.precheck_tick(&job_id, 5));
        assert_eq!(inner.lock().session.view(), SchedulerState::Idle);
    }
}
