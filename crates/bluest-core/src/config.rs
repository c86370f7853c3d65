//! Session and pipeline configuration

use std::time::Duration;

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for a [`DeviceSession`](crate::session::DeviceSession)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Delay between register polls while the device reports pending
    pub register_poll_interval: Duration,
    /// Upper bound on one register transaction; reported as cancellation
    pub register_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            register_poll_interval: Duration::ZERO,
            register_timeout: None,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delay between polls
    pub fn with_register_poll_interval(mut self, interval: Duration) -> Self {
        self.register_poll_interval = interval;
        self
    }

    /// Bound every register transaction
    pub fn with_register_timeout(mut self, timeout: Duration) -> Self {
        self.register_timeout = Some(timeout);
        self
    }
}

// ----------------------------------------------------------------------------
// Pipeline Configuration
// ----------------------------------------------------------------------------

/// Configuration for a [`NotificationPipeline`](crate::pipeline::NotificationPipeline)
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PipelineConfig {
    /// How long the consumer waits on an empty queue before re-checking
    pub idle_wait: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            idle_wait: Duration::from_millis(1),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the empty-queue wait
    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }
}
