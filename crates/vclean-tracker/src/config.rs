//! Tracker configuration.

use std::time::Duration;

/// Configuration for the job tracker.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Cadence of status polls while a job is active
    pub poll_interval: Duration,
    /// Buffered capacity of the boundary event channel
    pub event_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            event_capacity: 64,
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                std::env::var("VCLEAN_POLL_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            event_capacity: std::env::var("VCLEAN_EVENT_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(64),
        }
    }

    /// Override the poll cadence.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
