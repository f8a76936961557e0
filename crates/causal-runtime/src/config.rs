//! Process runtime configuration.

use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables shared by the three units of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of the inbound-message and outbound-request queues
    pub queue_capacity: usize,
    /// Backoff of the inbound unit when the transport has nothing pending
    pub poll_interval_ms: u64,
    /// Poll period while waiting for the inbound queue to drain
    pub drain_poll_interval_ms: u64,
    /// Pause after every scripted instruction
    pub step_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            poll_interval_ms: 1,
            drain_poll_interval_ms: 1,
            step_delay_ms: 0,
        }
    }
}

impl RuntimeConfig {
    /// Override the per-instruction pause.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay_ms = delay.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    /// Override the queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Inbound backoff.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Drain wait period.
    pub fn drain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.drain_poll_interval_ms)
    }

    /// Per-instruction pause; `None` when disabled.
    pub fn step_delay(&self) -> Option<Duration> {
        (self.step_delay_ms > 0).then(|| Duration::from_millis(self.step_delay_ms))
    }

    /// Reject settings that would stall or spin the units.
    pub fn validate(&self) -> RuntimeResult<()> {
        if self.queue_capacity == 0 {
            return Err(RuntimeError::invalid_configuration(
                "queue_capacity must be at least 1",
            ));
        }
        if self.poll_interval_ms == 0 || self.drain_poll_interval_ms == 0 {
            return Err(RuntimeError::invalid_configuration(
                "poll intervals must be at least 1ms",
            ));
        }
        Ok(())
    }
}
