//! In-memory stand-in for the remote resource store.
//!
//! Implements [`BindingFactory`] (per-type list/watch bindings over shared
//! state) and [`ResourceWriter`] (mutations broadcast as watch deltas), so a
//! cache, its sessions and a controller can run end to end without any
//! transport.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::client::BindingFactory;
use crate::client::ListSnapshot;
use crate::client::ListWatchBinding;
use crate::client::ResourceWriter;
use crate::client::Tombstone;
use crate::client::WatchDelta;
use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::resource::TypeKey;
use crate::ClientError;
use crate::Result;

const WATCH_BUFFER: usize = 1024;

#[derive(Default)]
struct ClusterState {
    version: u64,
    objects: HashMap<TypeKey, BTreeMap<ObjectKey, RawObject>>,
    watchers: HashMap<TypeKey, Vec<mpsc::Sender<WatchDelta>>>,
}

impl ClusterState {
    fn broadcast(&mut self, type_key: &TypeKey, delta: WatchDelta) {
        if let Some(watchers) = self.watchers.get_mut(type_key) {
            watchers.retain(|tx| tx.try_send(delta.clone()).is_ok());
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeCluster {
    state: Arc<Mutex<ClusterState>>,
    allowed: Option<HashSet<TypeKey>>,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cluster that only maps the given types; anything else fails with an
    /// unmapped-type error at binding time.
    pub fn with_types(types: impl IntoIterator<Item = TypeKey>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClusterState::default())),
            allowed: Some(types.into_iter().collect()),
        }
    }

    /// Creates an object, assigning it a fresh resource version.
    pub fn create_raw(&self, mut obj: RawObject) -> RawObject {
        let mut state = self.state.lock();
        state.version += 1;
        obj.meta.resource_version = state.version.to_string();
        sync_payload_meta(&mut obj);
        let type_key = obj.type_key.clone();
        state
            .objects
            .entry(type_key.clone())
            .or_default()
            .insert(obj.key(), obj.clone());
        state.broadcast(&type_key, WatchDelta::Added(obj.clone()));
        obj
    }

    /// Updates an object, bumping its resource version.
    pub fn update_raw(&self, mut obj: RawObject) -> RawObject {
        let mut state = self.state.lock();
        state.version += 1;
        obj.meta.resource_version = state.version.to_string();
        sync_payload_meta(&mut obj);
        let type_key = obj.type_key.clone();
        state
            .objects
            .entry(type_key.clone())
            .or_default()
            .insert(obj.key(), obj.clone());
        state.broadcast(&type_key, WatchDelta::Modified(obj.clone()));
        obj
    }

    /// Re-announces an object unchanged: a write that does not change the
    /// resource version.
    pub fn touch(&self, type_key: &TypeKey, key: &ObjectKey) {
        let mut state = self.state.lock();
        let Some(obj) = state.objects.get(type_key).and_then(|m| m.get(key)).cloned() else {
            return;
        };
        state.broadcast(type_key, WatchDelta::Modified(obj));
    }

    pub fn delete_raw(&self, type_key: &TypeKey, key: &ObjectKey) -> Option<RawObject> {
        let mut state = self.state.lock();
        state.version += 1;
        let old = state.objects.get_mut(type_key)?.remove(key)?;
        state.broadcast(type_key, WatchDelta::Removed(old.clone()));
        Some(old)
    }

    /// Deletes an object but delivers only a tombstone, optionally carrying
    /// the last-known state.
    pub fn delete_with_tombstone(&self, type_key: &TypeKey, key: &ObjectKey, carry_state: bool) {
        let mut state = self.state.lock();
        state.version += 1;
        let old = state.objects.get_mut(type_key).and_then(|m| m.remove(key));
        let tombstone = Tombstone {
            key: key.clone(),
            object: if carry_state { old } else { None },
        };
        state.broadcast(type_key, WatchDelta::RemovedFinalStateUnknown(tombstone));
    }

    /// Drops every open watch stream for the type, as a transport fault
    /// would; sessions are expected to re-list and resume.
    pub fn drop_watchers(&self, type_key: &TypeKey) {
        self.state.lock().watchers.remove(type_key);
    }

    pub fn object_count(&self, type_key: &TypeKey) -> usize {
        self.state
            .lock()
            .objects
            .get(type_key)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Keeps the payload's embedded metadata in step with the authoritative
/// metadata, so typed decodes observe the stored resource version.
fn sync_payload_meta(obj: &mut RawObject) {
    if let Some(meta_value) = obj.payload.get_mut("meta") {
        if let Ok(encoded) = serde_json::to_value(&obj.meta) {
            *meta_value = encoded;
        }
    }
}

impl BindingFactory for FakeCluster {
    fn binding_for(&self, type_key: &TypeKey) -> Result<Arc<dyn ListWatchBinding>> {
        if let Some(allowed) = &self.allowed {
            if !allowed.contains(type_key) {
                return Err(ClientError::UnmappedType {
                    type_key: type_key.clone(),
                }
                .into());
            }
        }
        Ok(Arc::new(FakeBinding {
            state: self.state.clone(),
            type_key: type_key.clone(),
        }))
    }
}

#[async_trait]
impl ResourceWriter for FakeCluster {
    async fn create(&self, obj: RawObject) -> Result<RawObject> {
        Ok(self.create_raw(obj))
    }

    async fn update(&self, obj: RawObject) -> Result<RawObject> {
        Ok(self.update_raw(obj))
    }

    async fn update_status(&self, obj: RawObject) -> Result<RawObject> {
        Ok(self.update_raw(obj))
    }

    async fn delete(&self, type_key: &TypeKey, key: &ObjectKey) -> Result<()> {
        self.delete_raw(type_key, key)
            .map(|_| ())
            .ok_or_else(|| ClientError::Write(format!("no such object {key}")).into())
    }
}

struct FakeBinding {
    state: Arc<Mutex<ClusterState>>,
    type_key: TypeKey,
}

#[async_trait]
impl ListWatchBinding for FakeBinding {
    async fn list(&self) -> Result<ListSnapshot> {
        let state = self.state.lock();
        let objects = state
            .objects
            .get(&self.type_key)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default();
        Ok(ListSnapshot {
            objects,
            resume_version: state.version.to_string(),
        })
    }

    async fn watch(&self, _from_version: String) -> Result<mpsc::Receiver<WatchDelta>> {
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        self.state
            .lock()
            .watchers
            .entry(self.type_key.clone())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
