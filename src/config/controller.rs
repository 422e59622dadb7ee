use config::ConfigError;
use serde::Deserialize;

use crate::config::BackoffPolicy;
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct ControllerSettings {
    /// Capacity of each event source's channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Per-key retry backoff applied to failed or requeued dispatches
    #[serde(default = "default_retry")]
    pub retry: BackoffPolicy,
}

fn default_event_buffer() -> usize {
    1024
}

fn default_retry() -> BackoffPolicy {
    // Fast first retries, capped well below the relist backoff ceiling
    BackoffPolicy {
        base_delay_ms: 5,
        max_delay_ms: 10_000,
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            event_buffer: default_event_buffer(),
            retry: default_retry(),
        }
    }
}

impl ControllerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer == 0 {
            return Err(ConfigError::Message("controller.event_buffer must be positive".into()).into());
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Message("controller.retry base delay exceeds max delay".into()).into());
        }
        Ok(())
    }
}
