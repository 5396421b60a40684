//! Shared data models for the VClean client.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs and their lifecycle statuses
//! - Processing parameters with range validation
//! - Remote status snapshots and progress normalization
//! - Pre-flight upload validation

pub mod job;
pub mod params;
pub mod snapshot;
pub mod validation;

// Re-export common types
pub use job::{ApplyOutcome, Job, JobId, JobStatus};
pub use params::{AudioLevel, ProcessingParams};
pub use snapshot::TaskSnapshot;
pub use validation::{validate_video_file, ValidationError, MAX_UPLOAD_BYTES};
