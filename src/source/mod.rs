//! Event sources: one per watched resource type, adapting a session's raw
//! store notifications into typed events behind a predicate chain.

mod adaptor;

pub use adaptor::*;


use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::ResourceCache;
use crate::event::Event;
use crate::event::GenericEvent;
use crate::event::Predicate;
use crate::resource::TypeKey;
use crate::Result;

/// Binds one resource type to the cache and exposes its adapted events as a
/// channel.
pub struct EventSource {
    type_key: TypeKey,
    cache: Arc<ResourceCache>,
}

impl EventSource {
    pub fn new(type_key: TypeKey, cache: Arc<ResourceCache>) -> Self {
        Self { type_key, cache }
    }

    /// Subscribes to the type's session (creating it on first use, which on
    /// a started cache blocks until its initial sync) and returns the
    /// receiving end of the adapted event stream.
    pub async fn event_channel(
        &self,
        predicates: Vec<Arc<dyn Predicate>>,
        buffer: usize,
    ) -> Result<mpsc::Receiver<Event>> {
        let session = self.cache.session(&self.type_key).await?;
        let mut notifications = session.subscribe();

        let (tx, rx) = mpsc::channel(buffer);
        let adaptor = EventAdaptor::new(predicates, tx);
        let type_key = self.type_key.clone();
        tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                if !adaptor.handle(notification).await {
                    // Receiver gone: the controller stopped
                    break;
                }
            }
            debug!("[source {}] notification stream ended", type_key);
        });

        Ok(rx)
    }
}

/// Channel-backed source for events originating outside the watch stream
/// (webhook callbacks, timers). Application code holds the sender and wires
/// its external trigger to it; injected events pass the predicate chain like
/// any other source.
pub struct GenericSource;

impl GenericSource {
    /// Returns the injection handle and the adapted event stream. The stream
    /// ends when every sender is dropped.
    pub fn channel(
        predicates: Vec<Arc<dyn Predicate>>,
        buffer: usize,
    ) -> (mpsc::Sender<GenericEvent>, mpsc::Receiver<Event>) {
        let (in_tx, mut in_rx) = mpsc::channel::<GenericEvent>(buffer);
        let (tx, rx) = mpsc::channel(buffer);
        tokio::spawn(async move {
            while let Some(injected) = in_rx.recv().await {
                let event = Event::Generic(injected);
                // First veto short-circuits
                if predicates.iter().any(|p| p.ignores(&event)) {
                    continue;
                }
                if tx.send(event).await.is_err() {
                    // Receiver gone: the controller stopped
                    break;
                }
            }
            debug!("[source generic] injection stream ended");
        });
        (in_tx, rx)
    }
}
