//! Transport seam for the tracker.
//!
//! The engine talks to the service through [`JobApi`] so tests can script
//! responses without a network. [`TransportClient`] is the production
//! implementation.

use std::path::Path;

use async_trait::async_trait;

use vclean_models::{JobId, ProcessingParams, TaskSnapshot};
use vclean_transport::{ProgressFn, TransportClient, TransportResult};

/// The service operations the tracker drives.
#[async_trait]
pub trait JobApi: Send + Sync {
    /// Upload a file for processing, reporting body progress.
    async fn submit(
        &self,
        path: &Path,
        params: &ProcessingParams,
        on_progress: ProgressFn,
    ) -> TransportResult<JobId>;

    /// Fetch the current status. One-shot; retry policy lives with the caller.
    async fn fetch_status(&self, job_id: &JobId) -> TransportResult<TaskSnapshot>;

    /// Best-effort cancellation.
    async fn cancel(&self, job_id: &JobId) -> TransportResult<()>;

    /// Download the finished artifact.
    async fn fetch_artifact(&self, job_id: &JobId) -> TransportResult<Vec<u8>>;
}

#[async_trait]
impl JobApi for TransportClient {
    async fn submit(
        &self,
        path: &Path,
        params: &ProcessingParams,
        on_progress: ProgressFn,
    ) -> TransportResult<JobId> {
        TransportClient::submit(self, path, params, on_progress).await
    }

    async fn fetch_status(&self, job_id: &JobId) -> TransportResult<TaskSnapshot> {
        TransportClient::fetch_status(self, job_id).await
    }

    async fn cancel(&self, job_id: &JobId) -> TransportResult<()> {
        TransportClient::cancel(self, job_id).await
    }

    async fn fetch_artifact(&self, job_id: &JobId) -> TransportResult<Vec<u8>> {
        TransportClient::fetch_artifact(self, job_id).await
    }
}
