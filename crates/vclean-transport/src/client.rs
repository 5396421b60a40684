//! REST client for the VClean service HTTP endpoints.
//!
//! Wraps the service API (multipart upload, status fetch, cancellation,
//! artifact download, health probe) using [`reqwest`]. The client holds no
//! job state; retry and scheduling policy live with the caller.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use vclean_models::{JobId, ProcessingParams, TaskSnapshot};

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::types::{HealthResponse, TaskEnvelope, UploadResponse};

/// Callback receiving transfer progress as a 0-100 percentage.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Upload read-chunk size (64 KiB).
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// HTTP client for a single VClean service instance.
#[derive(Clone)]
pub struct TransportClient {
    http: reqwest::Client,
    config: TransportConfig,
}

impl TransportClient {
    /// Create a new client for the configured service.
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TransportResult<Self> {
        Self::new(TransportConfig::from_env())
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, config: TransportConfig) -> Self {
        Self { http, config }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Upload a video for processing.
    ///
    /// Streams the file as the `file` part of a multipart `POST /upload`
    /// alongside the stringified parameters, invoking `on_progress` with the
    /// percentage of the body streamed so far. Resolves with the
    /// server-assigned job id.
    pub async fn submit(
        &self,
        path: &Path,
        params: &ProcessingParams,
        on_progress: ProgressFn,
    ) -> TransportResult<JobId> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        debug!(file = %file_name, bytes = total, "uploading video");

        struct ReadState {
            file: tokio::fs::File,
            sent: u64,
            total: u64,
            last_percent: Option<u8>,
            on_progress: ProgressFn,
        }

        let state = ReadState {
            file,
            sent: 0,
            total,
            last_percent: None,
            on_progress,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            let mut chunk = vec![0u8; UPLOAD_CHUNK_BYTES];
            match state.file.read(&mut chunk).await {
                Ok(0) => None,
                Ok(n) => {
                    chunk.truncate(n);
                    state.sent += n as u64;
                    let percent = if state.total == 0 {
                        100
                    } else {
                        (state.sent.saturating_mul(100) / state.total).min(100) as u8
                    };
                    if state.last_percent != Some(percent) {
                        state.last_percent = Some(percent);
                        (state.on_progress)(percent);
                    }
                    Some((Ok::<_, std::io::Error>(chunk), state))
                }
                Err(err) => Some((Err(err), state)),
            }
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            total,
        )
        .file_name(file_name)
        .mime_str("application/octet-stream")?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("epsilon", params.epsilon.to_string())
            .text("video_strength", params.video_strength.to_string())
            .text("audio_level", params.audio_level.as_str())
            .text("every_n_frames", params.every_n_frames.to_string())
            .text("user_id", params.user_id.clone());

        let response = self
            .http
            .post(format!("{}/upload", self.config.base_url))
            .multipart(form)
            .timeout(self.config.upload_timeout)
            .send()
            .await?;

        let http_status = response.status().as_u16();
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        let decoded: UploadResponse = Self::decode(&text)?;

        if decoded.status != "success" {
            return Err(TransportError::ServerError {
                status: http_status,
                body: decoded
                    .error
                    .unwrap_or_else(|| "unspecified upload error".to_string()),
            });
        }

        match decoded.task_id {
            Some(task_id) => {
                debug!(task_id = %task_id, "upload accepted");
                Ok(JobId::new(task_id))
            }
            None => Err(TransportError::InvalidResponse(
                "upload response missing task_id".to_string(),
            )),
        }
    }

    /// Fetch the current status of a job. One-shot; never retries.
    pub async fn fetch_status(&self, job_id: &JobId) -> TransportResult<TaskSnapshot> {
        let response = self
            .http
            .get(format!("{}/api/task/{}", self.config.base_url, job_id))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        let envelope: TaskEnvelope = Self::decode(&text)?;
        Ok(envelope.task)
    }

    /// Ask the service to cancel a job. Best-effort; success means the
    /// request was acknowledged, not that processing has already stopped.
    pub async fn cancel(&self, job_id: &JobId) -> TransportResult<()> {
        let response = self
            .http
            .post(format!("{}/api/cancel/{}", self.config.base_url, job_id))
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Fetch the processed artifact into memory.
    ///
    /// The service answers non-2xx until the job has completed, which maps
    /// to [`TransportError::ArtifactNotReady`].
    pub async fn fetch_artifact(&self, job_id: &JobId) -> TransportResult<Vec<u8>> {
        let response = self
            .http
            .get(format!("{}/api/download/{}", self.config.base_url, job_id))
            .timeout(self.config.upload_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::ArtifactNotReady);
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Stream the processed artifact to `dest`, reporting progress when the
    /// response carries a content length. Returns the number of bytes
    /// written.
    pub async fn fetch_artifact_to(
        &self,
        job_id: &JobId,
        dest: &Path,
        on_progress: Option<ProgressFn>,
    ) -> TransportResult<u64> {
        use futures::StreamExt;

        let response = self
            .http
            .get(format!("{}/api/download/{}", self.config.base_url, job_id))
            .timeout(self.config.upload_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::ArtifactNotReady);
        }

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut last_percent = None;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if let (Some(callback), Some(total)) = (&on_progress, total) {
                if total > 0 {
                    let percent = (written.saturating_mul(100) / total).min(100) as u8;
                    if last_percent != Some(percent) {
                        last_percent = Some(percent);
                        callback(percent);
                    }
                }
            }
        }

        file.flush().await?;
        debug!(job_id = %job_id, bytes = written, dest = %dest.display(), "artifact saved");
        Ok(written)
    }

    /// Check if the service is healthy.
    ///
    /// Transport failures map to `false`, never to an error: callers poll
    /// this to drive an online/offline indicator.
    pub async fn health(&self) -> bool {
        let url = format!("{}/api/health", self.config.base_url);

        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<HealthResponse>().await {
                    Ok(health) => health.status == "healthy",
                    Err(err) => {
                        warn!("health response undecodable: {}", err);
                        false
                    }
                }
            }
            Ok(response) => {
                warn!("health check failed: {}", response.status());
                false
            }
            Err(err) => {
                warn!("health check error: {}", err);
                false
            }
        }
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, or capture the status
    /// and body text as a [`TransportError::ServerError`].
    async fn ensure_success(response: reqwest::Response) -> TransportResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::ServerError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Decode a JSON body into the expected type.
    fn decode<T: DeserializeOwned>(text: &str) -> TransportResult<T> {
        serde_json::from_str(text).map_err(|err| TransportError::InvalidResponse(err.to_string()))
    }
}
