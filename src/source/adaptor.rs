//! Converts raw store notifications into typed events.
//!
//! Identity extraction must succeed for every object an event carries, or
//! the notification is dropped silently: the watch stream must keep flowing,
//! so malformed input is never a hard error. Deletes first unwrap the
//! unknown-final-state tombstone the watch mechanism may deliver in place of
//! the real last-known object.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::cache::DeletedObject;
use crate::cache::StoreNotification;
use crate::event::CreateEvent;
use crate::event::DeleteEvent;
use crate::event::Event;
use crate::event::Identity;
use crate::event::Predicate;
use crate::event::UpdateEvent;

pub struct EventAdaptor {
    predicates: Vec<Arc<dyn Predicate>>,
    sink: mpsc::Sender<Event>,
}

impl EventAdaptor {
    pub fn new(predicates: Vec<Arc<dyn Predicate>>, sink: mpsc::Sender<Event>) -> Self {
        Self { predicates, sink }
    }

    /// Adapts and forwards one notification. Returns false once the sink is
    /// closed; dropped notifications return true.
    pub async fn handle(&self, notification: StoreNotification) -> bool {
        let event = match notification {
            StoreNotification::Added(object) => match Identity::extract(&object.meta) {
                Some(identity) => Event::Create(CreateEvent { object, identity }),
                None => {
                    debug!("dropping add notification without identity");
                    return true;
                }
            },
            StoreNotification::Updated { old, new } => {
                match (Identity::extract(&old.meta), Identity::extract(&new.meta)) {
                    (Some(old_identity), Some(new_identity)) => Event::Update(UpdateEvent {
                        old_object: old,
                        old_identity,
                        new_object: new,
                        new_identity,
                    }),
                    _ => {
                        debug!("dropping update notification without identity");
                        return true;
                    }
                }
            }
            StoreNotification::Deleted(deleted) => {
                // Unwrap the tombstone before extracting identity
                let object = match deleted {
                    DeletedObject::Known(object) => object,
                    DeletedObject::FinalStateUnknown(tombstone) => match tombstone.object {
                        Some(object) => object,
                        None => {
                            debug!("dropping tombstone without last-known state for {}", tombstone.key);
                            return true;
                        }
                    },
                };
                match Identity::extract(&object.meta) {
                    Some(identity) => Event::Delete(DeleteEvent { object, identity }),
                    None => {
                        debug!("dropping delete notification without identity");
                        return true;
                    }
                }
            }
        };

        // First veto short-circuits
        if self.predicates.iter().any(|p| p.ignores(&event)) {
            return true;
        }

        self.sink.send(event).await.is_ok()
    }
}
