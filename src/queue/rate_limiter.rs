use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;

use crate::config::BackoffPolicy;

/// Per-item requeue pacing. Backoff state is per logical key and reset by
/// `forget` on success.
pub trait RateLimiter<K>: Send + Sync
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    /// Delay before the item may be re-added; records one more failure.
    fn when(&self, key: &K) -> Duration;

    /// Clears the item's backoff state.
    fn forget(&self, key: &K);

    /// Consecutive failures recorded for the item.
    fn num_requeues(&self, key: &K) -> u32;
}

/// Default limiter: per-key exponential backoff with a ceiling.
pub struct ExponentialBackoffLimiter<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    policy: BackoffPolicy,
    failures: DashMap<K, u32>,
}

impl<K> ExponentialBackoffLimiter<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            failures: DashMap::new(),
        }
    }
}

impl<K> RateLimiter<K> for ExponentialBackoffLimiter<K>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
{
    fn when(&self, key: &K) -> Duration {
        let mut entry = self.failures.entry(key.clone()).or_insert(0);
        let delay = self.policy.delay_for(*entry);
        *entry += 1;
        delay
    }

    fn forget(&self, key: &K) {
        self.failures.remove(key);
    }

    fn num_requeues(&self, key: &K) -> u32 {
        self.failures.get(key).map(|e| *e).unwrap_or(0)
    }
}
