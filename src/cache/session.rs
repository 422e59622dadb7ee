//! One watch session: the long-lived list/watch loop for a single resource
//! type, feeding its indexed store and fanning raw change notifications out
//! to subscribers.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::client::ListWatchBinding;
use crate::client::Tombstone;
use crate::client::WatchDelta;
use crate::config::CacheSettings;
use crate::metrics;
use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::resource::TypeKey;
use crate::store::IndexedStore;

/// A raw change applied to a session's store, as seen by subscribers.
#[derive(Debug, Clone)]
pub enum StoreNotification {
    Added(RawObject),
    Updated { old: RawObject, new: RawObject },
    Deleted(DeletedObject),
}

/// Object carried by a delete notification. The final state may be unknown
/// when the watch mechanism missed the true delete payload.
#[derive(Debug, Clone)]
pub enum DeletedObject {
    Known(RawObject),
    FinalStateUnknown(Tombstone),
}

pub struct WatchSession {
    type_key: TypeKey,
    binding: Arc<dyn ListWatchBinding>,
    store: Arc<IndexedStore>,
    synced_tx: watch::Sender<bool>,
    synced_rx: watch::Receiver<bool>,
    subscribers: parking_lot::Mutex<Vec<mpsc::Sender<StoreNotification>>>,
    settings: CacheSettings,
}

impl WatchSession {
    pub fn new(type_key: TypeKey, binding: Arc<dyn ListWatchBinding>, settings: CacheSettings) -> Self {
        let (synced_tx, synced_rx) = watch::channel(false);
        Self {
            type_key,
            binding,
            store: Arc::new(IndexedStore::new()),
            synced_tx,
            synced_rx,
            subscribers: parking_lot::Mutex::new(Vec::new()),
            settings,
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    pub fn store(&self) -> &Arc<IndexedStore> {
        &self.store
    }

    /// Whether the initial full listing has been received and applied.
    pub fn has_synced(&self) -> bool {
        *self.synced_rx.borrow()
    }

    /// A watch handle on the synced flag for sync barriers.
    pub fn synced_signal(&self) -> watch::Receiver<bool> {
        self.synced_rx.clone()
    }

    /// Subscribes to raw change notifications. Notifications for changes
    /// applied before the subscription are not replayed.
    pub fn subscribe(&self) -> mpsc::Receiver<StoreNotification> {
        let (tx, rx) = mpsc::channel(self.settings.notification_buffer);
        self.subscribers.lock().push(tx);
        rx
    }

    /// The session loop: list, apply the snapshot, mark synced, then stream
    /// deltas until the stream ends; retry with backoff, forever, until the
    /// stop signal fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut attempt: u32 = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }
            match self.list_and_watch(&shutdown, &mut attempt).await {
                Ok(()) => {
                    // Graceful end: shutdown observed
                    break;
                }
                Err(e) => {
                    let delay = jittered(self.settings.relist_backoff.delay_for(attempt));
                    attempt = attempt.saturating_add(1);
                    warn!(
                        "[session {}] list/watch failed ({}), re-listing in {:?}",
                        self.type_key, e, delay
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
        debug!("[session {}] stopped", self.type_key);
    }

    async fn list_and_watch(&self, shutdown: &CancellationToken, attempt: &mut u32) -> crate::Result<()> {
        let snapshot = self.binding.list().await?;
        // A successful list resets the re-list backoff
        *attempt = 0;
        info!(
            "[session {}] listed {} objects at version {}",
            self.type_key,
            snapshot.objects.len(),
            snapshot.resume_version
        );
        self.replace_contents(snapshot.objects).await;

        let mut stream = self.binding.watch(snapshot.resume_version).await?;

        // Synced only once the watch is in place: changes after the snapshot
        // cannot slip between list and watch unobserved
        if !self.has_synced() {
            self.synced_tx.send_replace(true);
            metrics::SESSIONS_SYNCED
                .with_label_values(&[&self.type_key.to_string()])
                .set(1.0);
        }
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    return Ok(());
                }
                delta = stream.recv() => {
                    match delta {
                        Some(delta) => self.apply(delta).await,
                        None => {
                            // Stream closed; caller re-lists
                            return Err(crate::ClientError::ListWatch(
                                format!("watch stream for {} ended", self.type_key),
                            ).into());
                        }
                    }
                }
            }
        }
    }

    /// Applies a fresh full listing by diffing against current contents, so
    /// subscribers see the re-list as incremental changes.
    async fn replace_contents(&self, objects: Vec<RawObject>) {
        let mut seen: Vec<ObjectKey> = Vec::with_capacity(objects.len());
        for obj in objects {
            seen.push(obj.key());
            self.apply(WatchDelta::Added(obj)).await;
        }
        for stale in self.store.keys() {
            if !seen.contains(&stale) {
                if let Some(old) = self.store.remove(&stale) {
                    self.notify(StoreNotification::Deleted(DeletedObject::Known(old))).await;
                }
            }
        }
    }

    async fn apply(&self, delta: WatchDelta) {
        match delta {
            // Added-of-known-key degrades to Updated and Modified-of-unknown
            // to Added, keeping store and notifications coherent across
            // re-lists.
            WatchDelta::Added(obj) | WatchDelta::Modified(obj) => {
                let new = obj.clone();
                match self.store.upsert(obj) {
                    // No-op writes and re-list echoes still notify as
                    // updates; filtering them is predicate business
                    Some(old) => self.notify(StoreNotification::Updated { old, new }).await,
                    None => self.notify(StoreNotification::Added(new)).await,
                }
            }
            WatchDelta::Removed(obj) => {
                self.store.remove(&obj.key());
                self.notify(StoreNotification::Deleted(DeletedObject::Known(obj))).await;
            }
            WatchDelta::RemovedFinalStateUnknown(tombstone) => {
                self.store.remove(&tombstone.key);
                self.notify(StoreNotification::Deleted(DeletedObject::FinalStateUnknown(
                    tombstone,
                )))
                .await;
            }
        }
    }

    async fn notify(&self, notification: StoreNotification) {
        let targets: Vec<mpsc::Sender<StoreNotification>> = self.subscribers.lock().clone();
        let mut closed = false;
        for tx in &targets {
            if tx.send(notification.clone()).await.is_err() {
                closed = true;
            }
        }
        if closed {
            self.subscribers.lock().retain(|tx| !tx.is_closed());
        }
    }
}

/// Adds up to 10% random jitter so sessions hitting the same fault do not
/// re-list in lockstep.
fn jittered(delay: std::time::Duration) -> std::time::Duration {
    let millis = delay.as_millis() as u64;
    if millis == 0 {
        return delay;
    }
    let jitter = rand::thread_rng().gen_range(0..=millis / 10);
    delay + std::time::Duration::from_millis(jitter)
}
