//! Admission predicates applied to events before delivery.
//!
//! Predicates are chained: the first one to veto drops the event. A hook
//! that is not overridden admits its kind.

use crate::event::CreateEvent;
use crate::event::DeleteEvent;
use crate::event::Event;
use crate::event::GenericEvent;
use crate::event::UpdateEvent;

pub trait Predicate: Send + Sync + 'static {
    fn ignore_create(&self, _e: &CreateEvent) -> bool {
        false
    }

    fn ignore_update(&self, _e: &UpdateEvent) -> bool {
        false
    }

    fn ignore_delete(&self, _e: &DeleteEvent) -> bool {
        false
    }

    fn ignore_generic(&self, _e: &GenericEvent) -> bool {
        false
    }

    /// Routes an event to the matching hook.
    fn ignores(&self, event: &Event) -> bool {
        match event {
            Event::Create(e) => self.ignore_create(e),
            Event::Update(e) => self.ignore_update(e),
            Event::Delete(e) => self.ignore_delete(e),
            Event::Generic(e) => self.ignore_generic(e),
        }
    }
}

type CreateFn = Box<dyn Fn(&CreateEvent) -> bool + Send + Sync>;
type UpdateFn = Box<dyn Fn(&UpdateEvent) -> bool + Send + Sync>;
type DeleteFn = Box<dyn Fn(&DeleteEvent) -> bool + Send + Sync>;
type GenericFn = Box<dyn Fn(&GenericEvent) -> bool + Send + Sync>;

/// Closure-bundle predicate: set only the hooks you need.
#[derive(Default)]
pub struct PredicateFuncs {
    pub ignore_create_fn: Option<CreateFn>,
    pub ignore_update_fn: Option<UpdateFn>,
    pub ignore_delete_fn: Option<DeleteFn>,
    pub ignore_generic_fn: Option<GenericFn>,
}

impl Predicate for PredicateFuncs {
    fn ignore_create(&self, e: &CreateEvent) -> bool {
        self.ignore_create_fn.as_ref().map(|f| f(e)).unwrap_or(false)
    }

    fn ignore_update(&self, e: &UpdateEvent) -> bool {
        self.ignore_update_fn.as_ref().map(|f| f(e)).unwrap_or(false)
    }

    fn ignore_delete(&self, e: &DeleteEvent) -> bool {
        self.ignore_delete_fn.as_ref().map(|f| f(e)).unwrap_or(false)
    }

    fn ignore_generic(&self, e: &GenericEvent) -> bool {
        self.ignore_generic_fn.as_ref().map(|f| f(e)).unwrap_or(false)
    }
}

/// Ignores updates that did not change the resource version (no-op writes,
/// resync echoes). Missing versions are treated as unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceVersionChanged;

impl Predicate for ResourceVersionChanged {
    fn ignore_update(&self, e: &UpdateEvent) -> bool {
        e.old_identity.resource_version.is_empty()
            || e.new_identity.resource_version.is_empty()
            || e.old_identity.resource_version == e.new_identity.resource_version
    }
}
