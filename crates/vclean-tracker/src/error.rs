//! Tracker error types.

use thiserror::Error;
use vclean_models::ValidationError;
use vclean_transport::TransportError;

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors from the job lifecycle layer.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A job is already tracked; clear it before submitting another.
    #[error("a job is already active")]
    AlreadyActive,

    /// No job is in the state the operation requires.
    #[error("no job in the required state")]
    NotReady,

    /// Rejected before any network call.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The service request failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
