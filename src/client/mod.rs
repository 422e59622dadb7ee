//! Contracts of the external collaborators the engine depends on.
//!
//! The engine ships no transport: how a [`TypeKey`] maps to remote list/watch
//! endpoints, and how mutations reach the remote store, are behind these
//! trait seams. Watch sessions treat a binding as a trusted primitive that
//! eventually delivers every change in the absence of permanent faults.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;

use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::resource::TypeKey;
use crate::Result;

/// Snapshot returned by an initial list: the objects plus the resume token
/// the subsequent watch starts from.
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub objects: Vec<RawObject>,
    pub resume_version: String,
}

/// Placeholder delivered on delete when the watch mechanism missed the true
/// final state of the object.
#[derive(Debug, Clone)]
pub struct Tombstone {
    pub key: ObjectKey,
    pub object: Option<RawObject>,
}

/// One incremental change streamed by a watch.
#[derive(Debug, Clone)]
pub enum WatchDelta {
    Added(RawObject),
    Modified(RawObject),
    Removed(RawObject),
    RemovedFinalStateUnknown(Tombstone),
}

/// One resource type's list/watch endpoints against the remote store.
///
/// Transport-level retry and reconnect belong to the implementor; the owning
/// session re-lists when the stream ends.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ListWatchBinding: Send + Sync + 'static {
    /// Full snapshot plus the version to resume watching from.
    async fn list(&self) -> Result<ListSnapshot>;

    /// Stream of changes after `from_version`. The channel closing signals
    /// the end of this watch; the caller re-lists to resume.
    async fn watch(&self, from_version: String) -> Result<mpsc::Receiver<WatchDelta>>;
}

/// Maps a resource type to its list/watch binding. An unmapped type is a
/// configuration error surfaced to the caller that first touched the type.
pub trait BindingFactory: Send + Sync + 'static {
    fn binding_for(&self, type_key: &TypeKey) -> Result<Arc<dyn ListWatchBinding>>;
}

/// Thin typed mutation client against the remote store.
///
/// Used by application code and tests; the engine itself is read-path only.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceWriter: Send + Sync {
    async fn create(&self, obj: RawObject) -> Result<RawObject>;

    async fn update(&self, obj: RawObject) -> Result<RawObject>;

    /// Updates only the status portion of the object.
    async fn update_status(&self, obj: RawObject) -> Result<RawObject>;

    async fn delete(&self, type_key: &TypeKey, key: &ObjectKey) -> Result<()>;
}
