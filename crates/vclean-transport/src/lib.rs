//! HTTP client for the VClean processing service.
//!
//! This crate provides:
//! - Multipart upload with streaming progress
//! - One-shot status fetch (no internal retries)
//! - Best-effort cancellation
//! - Artifact download (in-memory and streamed to disk)
//! - Health probe

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{ProgressFn, TransportClient};
pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use types::{HealthResponse, TaskEnvelope, UploadResponse};
