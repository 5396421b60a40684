//! Wire request/response shapes.

use serde::{Deserialize, Serialize};
use vclean_models::TaskSnapshot;

/// Response from `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// `"success"` or `"error"`
    pub status: String,
    /// Server-assigned task id on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Error detail on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Envelope around `GET /api/task/{id}` responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task: TaskSnapshot,
}

/// Response from `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
