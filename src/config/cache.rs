use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;

use crate::config::BackoffPolicy;
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// How long a lazy first access may wait for the new session's initial
    /// sync before failing (unit: milliseconds)
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// Capacity of each session's per-subscriber notification channel
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,

    /// Backoff for re-listing after a watch stream ends or a list fails
    #[serde(default)]
    pub relist_backoff: BackoffPolicy,
}

fn default_sync_timeout_ms() -> u64 {
    30_000
}

fn default_notification_buffer() -> usize {
    1024
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sync_timeout_ms: default_sync_timeout_ms(),
            notification_buffer: default_notification_buffer(),
            relist_backoff: BackoffPolicy {
                base_delay_ms: 500,
                max_delay_ms: 30_000,
            },
        }
    }
}

impl CacheSettings {
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_timeout_ms == 0 {
            return Err(ConfigError::Message("cache.sync_timeout_ms must be positive".into()).into());
        }
        if self.notification_buffer == 0 {
            return Err(ConfigError::Message("cache.notification_buffer must be positive".into()).into());
        }
        if self.relist_backoff.base_delay_ms > self.relist_backoff.max_delay_ms {
            return Err(ConfigError::Message(
                "cache.relist_backoff base delay exceeds max delay".into(),
            )
            .into());
        }
        Ok(())
    }
}
