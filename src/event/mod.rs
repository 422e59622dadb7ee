//! Typed change events delivered to reconciliation handlers.
//!
//! [`Event`] is a closed union: every event a source can produce is one of
//! the four kinds below, so dispatch matches are exhaustive and there is no
//! unknown-kind path at runtime.

mod predicate;

pub use predicate::*;


use crate::resource::ObjectMeta;
use crate::resource::RawObject;
use crate::resource::TypeKey;

/// Identity metadata detached from an object, so handlers can route an event
/// without decoding its payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub name: String,
    pub namespace: String,
    pub resource_version: String,
}

impl Identity {
    /// Extraction fails on an object without a name; such notifications are
    /// malformed and get dropped at the adaptor boundary.
    pub fn extract(meta: &ObjectMeta) -> Option<Self> {
        if meta.name.is_empty() {
            return None;
        }
        Some(Self {
            name: meta.name.clone(),
            namespace: meta.namespace.clone(),
            resource_version: meta.resource_version.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub object: RawObject,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub old_object: RawObject,
    pub old_identity: Identity,
    pub new_object: RawObject,
    pub new_identity: Identity,
}

#[derive(Debug, Clone)]
pub struct DeleteEvent {
    pub object: RawObject,
    pub identity: Identity,
}

/// An event originating outside the watch stream (injected by application
/// code rather than observed from the remote store).
#[derive(Debug, Clone)]
pub struct GenericEvent {
    pub object: RawObject,
    pub identity: Identity,
}

#[derive(Debug, Clone)]
pub enum Event {
    Create(CreateEvent),
    Update(UpdateEvent),
    Delete(DeleteEvent),
    Generic(GenericEvent),
}

/// Discriminant of an [`Event`], used in queue keys and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Update,
    Delete,
    Generic,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Update => "update",
            EventKind::Delete => "delete",
            EventKind::Generic => "generic",
        }
    }
}

/// Logical dedup key of an event: kind + type + object identity (without the
/// resource version, so two revisions of the same change coalesce).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub kind: EventKind,
    pub type_key: TypeKey,
    pub namespace: String,
    pub name: String,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Create(_) => EventKind::Create,
            Event::Update(_) => EventKind::Update,
            Event::Delete(_) => EventKind::Delete,
            Event::Generic(_) => EventKind::Generic,
        }
    }

    /// Identity of the object the event is about; for updates, the new
    /// revision's identity.
    pub fn identity(&self) -> &Identity {
        match self {
            Event::Create(e) => &e.identity,
            Event::Update(e) => &e.new_identity,
            Event::Delete(e) => &e.identity,
            Event::Generic(e) => &e.identity,
        }
    }

    pub fn type_key(&self) -> &TypeKey {
        match self {
            Event::Create(e) => &e.object.type_key,
            Event::Update(e) => &e.new_object.type_key,
            Event::Delete(e) => &e.object.type_key,
            Event::Generic(e) => &e.object.type_key,
        }
    }

    pub fn event_key(&self) -> EventKey {
        let id = self.identity();
        EventKey {
            kind: self.kind(),
            type_key: self.type_key().clone(),
            namespace: id.namespace.clone(),
            name: id.name.clone(),
        }
    }
}
