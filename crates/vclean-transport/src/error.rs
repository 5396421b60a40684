//! Transport error types.

use thiserror::Error;

pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from the VClean service HTTP layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The HTTP request itself failed (connection, DNS, TLS, timeout).
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The service answered with an error, either a non-2xx status or an
    /// application-level `{status: "error"}` body.
    #[error("server error ({status}): {body}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error detail from the response body
        body: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The artifact was requested before the job completed.
    #[error("artifact not ready")]
    ArtifactNotReady,

    /// Local file I/O failed while streaming an upload or download.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
