use std::time::Duration;

use serde::Deserialize;

/// Basic backoff policy template.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_base_delay_ms() -> u64 {
    5
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    pub fn base(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay for the n-th consecutive failure: base doubled per failure,
    /// capped at the maximum.
    pub fn delay_for(&self, failures: u32) -> Duration {
        let base = self.base_delay_ms.max(1);
        let exp = failures.min(63);
        let delay = base.saturating_mul(1u64.checked_shl(exp).unwrap_or(u64::MAX));
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}
