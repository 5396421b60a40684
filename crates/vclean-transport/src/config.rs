//! Transport configuration.

use std::time::Duration;

/// Configuration for the service client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the processing service
    pub base_url: String,
    /// Timeout for status/cancel/health requests
    pub request_timeout: Duration,
    /// Timeout for uploads and artifact downloads
    pub upload_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(600),
        }
    }
}

impl TransportConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VCLEAN_SERVER_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("VCLEAN_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            upload_timeout: Duration::from_secs(
                std::env::var("VCLEAN_UPLOAD_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
        }
    }

    /// Override the base URL, trimming any trailing slash.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TransportConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config = TransportConfig::default().with_base_url("http://host:9000/");
        assert_eq!(config.base_url, "http://host:9000");
    }
}
