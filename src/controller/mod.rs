//! The reconciliation controller: fan-in of per-type event sources into one
//! deduplicating rate-limited queue, and a dispatch loop driving the user
//! handler.
//!
//! Lifecycle: sources are registered with `watch` (at most once per type) or
//! `watch_channel` (externally injected events), then `start` consumes the
//! controller, runs fan-in and dispatch under one stop signal, and returns
//! only after both have exited.


use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::cache::ResourceCache;
use crate::config::ControllerSettings;
use crate::event::CreateEvent;
use crate::event::DeleteEvent;
use crate::event::Event;
use crate::event::EventKey;
use crate::event::GenericEvent;
use crate::event::Predicate;
use crate::event::UpdateEvent;
use crate::metrics;
use crate::queue::ExponentialBackoffLimiter;
use crate::queue::QueueItem;
use crate::queue::WorkQueue;
use crate::resource::TypeKey;
use crate::source::EventSource;
use crate::source::GenericSource;
use crate::ControllerError;
use crate::Result;

/// What the handler wants done with the event after this invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reconcile {
    /// Re-add through the rate limiter.
    pub requeue: bool,
    /// Re-add after a fixed delay, bypassing the backoff counter.
    pub requeue_after: Option<std::time::Duration>,
}

impl Reconcile {
    /// Done with this event; forget its backoff state.
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    pub fn requeue_after(delay: std::time::Duration) -> Self {
        Self {
            requeue: false,
            requeue_after: Some(delay),
        }
    }
}

/// User-supplied reconciliation logic, dispatched per event kind.
///
/// A returned error is never surfaced; it converts into a rate-limited
/// requeue of the same event.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn on_create(&self, event: CreateEvent) -> Result<Reconcile>;

    async fn on_update(&self, event: UpdateEvent) -> Result<Reconcile>;

    async fn on_delete(&self, event: DeleteEvent) -> Result<Reconcile>;

    async fn on_generic(&self, event: GenericEvent) -> Result<Reconcile>;
}

impl QueueItem for Event {
    type Key = EventKey;

    fn item_key(&self) -> EventKey {
        self.event_key()
    }
}

pub struct Controller {
    name: String,
    cache: Arc<ResourceCache>,
    settings: ControllerSettings,
    watched: HashSet<TypeKey>,
    sources: Vec<mpsc::Receiver<Event>>,
}

impl Controller {
    pub fn new(name: impl Into<String>, cache: Arc<ResourceCache>, settings: ControllerSettings) -> Self {
        Self {
            name: name.into(),
            cache,
            settings,
            watched: HashSet::new(),
            sources: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of registered sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Binds an event source for `type_key`. A type may be watched at most
    /// once; only callable before `start` (which consumes the controller).
    pub async fn watch(&mut self, type_key: TypeKey, predicates: Vec<Arc<dyn Predicate>>) -> Result<()> {
        if self.watched.contains(&type_key) {
            return Err(ControllerError::AlreadyWatched {
                name: self.name.clone(),
                type_key,
            }
            .into());
        }

        let source = EventSource::new(type_key.clone(), self.cache.clone());
        let rx = source.event_channel(predicates, self.settings.event_buffer).await?;
        self.watched.insert(type_key);
        self.sources.push(rx);
        Ok(())
    }

    /// Binds a channel-backed source for events originating outside the
    /// watch stream. Returns the injection handle; application code wires
    /// its external trigger (a webhook endpoint, a timer) to it. Injected
    /// events dispatch to the handler's generic hook.
    pub fn watch_channel(&mut self, predicates: Vec<Arc<dyn Predicate>>) -> mpsc::Sender<GenericEvent> {
        let (tx, rx) = GenericSource::channel(predicates, self.settings.event_buffer);
        self.sources.push(rx);
        tx
    }

    /// Runs the controller until the stop signal fires: fan-in of every
    /// source into the work queue, and the dispatch loop over the queue.
    /// Returns after both loops have exited.
    pub async fn start<H: EventHandler>(self, handler: H, shutdown: CancellationToken) {
        let limiter = Arc::new(ExponentialBackoffLimiter::new(self.settings.retry));
        let queue: WorkQueue<Event> = WorkQueue::new(self.name.clone(), limiter);

        info!(
            "[controller {}] starting with {} source(s)",
            self.name,
            self.sources.len()
        );

        let fan_in = tokio::spawn(collect_events(
            self.name.clone(),
            self.sources,
            queue.clone(),
            shutdown.clone(),
        ));
        let dispatch = tokio::spawn(process_events(self.name.clone(), Arc::new(handler), queue));

        // Join semantics: both loops observe the same stop signal
        let _ = tokio::join!(fan_in, dispatch);
        info!("[controller] stopped");
    }
}

/// Fan-in: multiplexes every source's channel plus the stop signal. A source
/// whose channel closes drops out of the multiplex set; the stop signal
/// shuts the queue down and exits.
async fn collect_events(
    name: String,
    sources: Vec<mpsc::Receiver<Event>>,
    queue: WorkQueue<Event>,
    shutdown: CancellationToken,
) {
    let mut streams: StreamMap<usize, ReceiverStream<Event>> = StreamMap::new();
    for (idx, rx) in sources.into_iter().enumerate() {
        streams.insert(idx, ReceiverStream::new(rx));
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                break;
            }
            next = streams.next(), if !streams.is_empty() => {
                match next {
                    Some((_idx, event)) => queue.add(event),
                    // StreamMap already removed the exhausted source
                    None => {}
                }
            }
            else => {
                // Every source closed; wait for the stop signal
                shutdown.cancelled().await;
                break;
            }
        }
    }

    debug!("[controller {}] event collection stopped", name);
    queue.shut_down();
}

/// Dispatch loop: pops one item at a time, routes it by kind and applies the
/// handler's verdict to the queue.
async fn process_events<H: EventHandler>(name: String, handler: Arc<H>, queue: WorkQueue<Event>) {
    loop {
        // Queue shutdown (triggered by the stop signal via fan-in) ends the
        // loop once the queue has drained
        let Some(event) = queue.get().await else {
            break;
        };
        let key = event.item_key();
        metrics::DISPATCHED_EVENTS
            .with_label_values(&[&name, event.kind().as_str()])
            .inc();

        let retained = event.clone();
        let verdict = match event {
            Event::Create(e) => handler.on_create(e).await,
            Event::Update(e) => handler.on_update(e).await,
            Event::Delete(e) => handler.on_delete(e).await,
            Event::Generic(e) => handler.on_generic(e).await,
        };

        match verdict {
            Err(e) => {
                // Handler errors are never surfaced; retry with backoff
                warn!("[controller {}] handler failed for {:?}: {}", name, key, e);
                queue.add_rate_limited(retained);
            }
            Ok(r) => {
                if let Some(delay) = r.requeue_after {
                    queue.add_after(retained, delay);
                } else if r.requeue {
                    queue.add_rate_limited(retained);
                } else {
                    queue.forget(&key);
                }
            }
        }
        queue.done(&key);
    }
    debug!("[controller {}] event processing stopped", name);
}
