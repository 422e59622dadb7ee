//! Work queue in the mark-dirty / mark-processing discipline.
//!
//! Invariants:
//! - at most one pending entry per logical key; a duplicate add while the
//!   key is pending coalesces, keeping the latest payload;
//! - a key currently being processed is not handed out again; an add during
//!   processing parks the item until `done` for that key;
//! - after `shut_down`, remaining queued items drain and `get` then returns
//!   `None`.
//!
//! The queue is multi-producer, single-consumer: one dispatch loop calls
//! `get`, so `Notify::notify_one` permits cover every wakeup.

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::metrics;
use crate::queue::RateLimiter;

/// An item that can be queued: carries a stable logical key.
pub trait QueueItem: Clone + Send + 'static {
    type Key: Hash + Eq + Clone + Send + Sync + std::fmt::Debug + 'static;

    fn item_key(&self) -> Self::Key;
}

struct QueueInner<T: QueueItem> {
    order: VecDeque<T::Key>,
    items: HashMap<T::Key, T>,
    dirty: HashSet<T::Key>,
    processing: HashSet<T::Key>,
    shutting_down: bool,
}

struct QueueCore<T: QueueItem> {
    name: String,
    inner: Mutex<QueueInner<T>>,
    wakeup: Notify,
    limiter: Arc<dyn RateLimiter<T::Key>>,
}

/// Cloneable handle to one shared queue.
pub struct WorkQueue<T: QueueItem> {
    core: Arc<QueueCore<T>>,
}

impl<T: QueueItem> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<T: QueueItem> WorkQueue<T> {
    pub fn new(name: impl Into<String>, limiter: Arc<dyn RateLimiter<T::Key>>) -> Self {
        Self {
            core: Arc::new(QueueCore {
                name: name.into(),
                inner: Mutex::new(QueueInner {
                    order: VecDeque::new(),
                    items: HashMap::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                    shutting_down: false,
                }),
                wakeup: Notify::new(),
                limiter,
            }),
        }
    }

    /// Adds an item, deduplicating by key.
    pub fn add(&self, item: T) {
        let key = item.item_key();
        let mut inner = self.core.inner.lock();
        if inner.shutting_down {
            return;
        }
        if inner.dirty.contains(&key) {
            // Pending already; keep the newest payload
            inner.items.insert(key, item);
            return;
        }
        inner.dirty.insert(key.clone());
        inner.items.insert(key.clone(), item);
        if !inner.processing.contains(&key) {
            inner.order.push_back(key);
            drop(inner);
            metrics::QUEUE_DEPTH.with_label_values(&[&self.core.name]).inc();
            metrics::QUEUE_ADDS.with_label_values(&[&self.core.name]).inc();
            self.core.wakeup.notify_one();
        }
    }

    /// Re-adds after a fixed delay, bypassing the rate limiter.
    pub fn add_after(&self, item: T, delay: Duration) {
        if delay.is_zero() {
            self.add(item);
            return;
        }
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Re-adds through the rate limiter's backoff curve.
    pub fn add_rate_limited(&self, item: T) {
        let key = item.item_key();
        let delay = self.core.limiter.when(&key);
        trace!(
            "queue {}: retry #{} for {:?} in {:?}",
            self.core.name,
            self.core.limiter.num_requeues(&key),
            key,
            delay
        );
        metrics::QUEUE_RETRIES.with_label_values(&[&self.core.name]).inc();
        self.add_after(item, delay);
    }

    /// Pops the next item, waiting while the queue is empty. Returns `None`
    /// once the queue is shut down and drained. Single consumer.
    pub async fn get(&self) -> Option<T> {
        loop {
            {
                let mut inner = self.core.inner.lock();
                if let Some(key) = inner.order.pop_front() {
                    inner.dirty.remove(&key);
                    inner.processing.insert(key.clone());
                    let item = inner
                        .items
                        .get(&key)
                        .cloned()
                        .unwrap_or_else(|| unreachable!("queued key {key:?} has no item"));
                    drop(inner);
                    metrics::QUEUE_DEPTH.with_label_values(&[&self.core.name]).dec();
                    return Some(item);
                }
                if inner.shutting_down {
                    return None;
                }
            }
            self.core.wakeup.notified().await;
        }
    }

    /// Marks processing of the item's key finished. If the key went dirty
    /// while in flight, it is queued again.
    pub fn done(&self, key: &T::Key) {
        let mut inner = self.core.inner.lock();
        inner.processing.remove(key);
        if inner.dirty.contains(key) {
            inner.order.push_back(key.clone());
            drop(inner);
            metrics::QUEUE_DEPTH.with_label_values(&[&self.core.name]).inc();
            self.core.wakeup.notify_one();
        } else {
            inner.items.remove(key);
        }
    }

    /// Resets the key's backoff state.
    pub fn forget(&self, key: &T::Key) {
        self.core.limiter.forget(key);
    }

    /// Consecutive rate-limited requeues recorded for the key.
    pub fn num_requeues(&self, key: &T::Key) -> u32 {
        self.core.limiter.num_requeues(key)
    }

    /// Stops accepting adds and wakes the consumer to drain what is queued.
    pub fn shut_down(&self) {
        let mut inner = self.core.inner.lock();
        inner.shutting_down = true;
        drop(inner);
        self.core.wakeup.notify_one();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.core.inner.lock().shutting_down
    }

    pub fn len(&self) -> usize {
        self.core.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.inner.lock().order.is_empty()
    }
}
