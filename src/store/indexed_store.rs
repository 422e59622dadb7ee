//! Per-type local store with a primary key and named secondary indexes.
//!
//! Mutations come from the type's watch loop; reads come from `Get`/`List`
//! callers. One coarse reader/writer lock keeps the object map and every
//! index bucket consistent: a reader never observes an object under an index
//! value it no longer has, nor missing from one it currently has.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::store::ListOptions;
use crate::CacheError;
use crate::Result;

/// Name of the index every store is seeded with.
pub const NAMESPACE_INDEX: &str = "namespace";

/// Extracts zero or more raw index values from an object.
pub type IndexExtractor = Arc<dyn Fn(&RawObject) -> Vec<String> + Send + Sync>;

/// Index bucket key for a raw value extracted from an object in `namespace`.
///
/// Namespaced objects register under both `ns/value` and the unscoped
/// `/value` so one index serves namespace-restricted and global lookups;
/// cluster-scoped objects register under the bare value only.
fn scoped_keys(namespace: &str, raw: &str) -> Vec<String> {
    if namespace.is_empty() {
        vec![raw.to_string()]
    } else {
        vec![format!("{namespace}/{raw}"), format!("/{raw}")]
    }
}

/// Lookup keys for querying an index for `raw`, optionally restricted to a
/// namespace. The unrestricted form must see both namespaced objects
/// (indexed at `/raw`) and cluster-scoped objects (indexed at `raw`).
fn lookup_keys(namespace: Option<&str>, raw: &str) -> Vec<String> {
    match namespace {
        Some(ns) if !ns.is_empty() => vec![format!("{ns}/{raw}")],
        _ => vec![format!("/{raw}"), raw.to_string()],
    }
}

struct Index {
    extractor: IndexExtractor,
    buckets: HashMap<String, HashSet<ObjectKey>>,
}

impl Index {
    fn insert(&mut self, obj: &RawObject) {
        let key = obj.key();
        for raw in (self.extractor)(obj) {
            for bucket in scoped_keys(&obj.meta.namespace, &raw) {
                self.buckets.entry(bucket).or_default().insert(key.clone());
            }
        }
    }

    fn remove(&mut self, obj: &RawObject) {
        let key = obj.key();
        for raw in (self.extractor)(obj) {
            for bucket in scoped_keys(&obj.meta.namespace, &raw) {
                if let Some(set) = self.buckets.get_mut(&bucket) {
                    set.remove(&key);
                    if set.is_empty() {
                        self.buckets.remove(&bucket);
                    }
                }
            }
        }
    }
}

#[derive(Default)]
struct StoreInner {
    objects: HashMap<ObjectKey, RawObject>,
    indexes: HashMap<String, Index>,
}

/// Indexed local store for one resource type.
pub struct IndexedStore {
    inner: RwLock<StoreInner>,
}

impl Default for IndexedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexedStore {
    /// A new store is seeded with the default namespace index.
    pub fn new() -> Self {
        let store = Self {
            inner: RwLock::new(StoreInner::default()),
        };
        store
            .add_index(
                NAMESPACE_INDEX,
                Arc::new(|obj: &RawObject| {
                    if obj.meta.namespace.is_empty() {
                        vec![]
                    } else {
                        vec![obj.meta.namespace.clone()]
                    }
                }),
            )
            .unwrap_or_else(|_| unreachable!("empty store has no indexes"));
        store
    }

    /// Registers a named secondary index and retro-indexes current objects.
    /// Index names are unique per store.
    pub fn add_index(&self, name: &str, extractor: IndexExtractor) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.indexes.contains_key(name) {
            return Err(CacheError::IndexExists {
                name: name.to_string(),
            }
            .into());
        }
        let mut index = Index {
            extractor,
            buckets: HashMap::new(),
        };
        for obj in inner.objects.values() {
            index.insert(obj);
        }
        inner.indexes.insert(name.to_string(), index);
        Ok(())
    }

    /// Inserts or replaces one object, returning the previous revision.
    pub fn upsert(&self, obj: RawObject) -> Option<RawObject> {
        let mut inner = self.inner.write();
        let key = obj.key();
        let old = inner.objects.remove(&key);
        for index in inner.indexes.values_mut() {
            if let Some(old) = &old {
                index.remove(old);
            }
            index.insert(&obj);
        }
        inner.objects.insert(key, obj);
        old
    }

    /// Removes one object by key, purging it from every index.
    pub fn remove(&self, key: &ObjectKey) -> Option<RawObject> {
        let mut inner = self.inner.write();
        let old = inner.objects.remove(key)?;
        for index in inner.indexes.values_mut() {
            index.remove(&old);
        }
        Some(old)
    }

    pub fn get(&self, key: &ObjectKey) -> Option<RawObject> {
        self.inner.read().objects.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().objects.is_empty()
    }

    /// Every primary key currently in the store.
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.inner.read().objects.keys().cloned().collect()
    }

    /// Lists objects matching `opts`. A field selector resolves through its
    /// registered index; an unregistered field is an error.
    pub fn list(&self, opts: &ListOptions) -> Result<Vec<RawObject>> {
        let inner = self.inner.read();

        let candidates: Vec<&RawObject> = match &opts.field_selector {
            Some(sel) => {
                let index = inner.indexes.get(&sel.field).ok_or_else(|| CacheError::UnknownIndex {
                    field: sel.field.clone(),
                })?;
                let mut keys: HashSet<&ObjectKey> = HashSet::new();
                for bucket in lookup_keys(opts.namespace.as_deref(), &sel.value) {
                    if let Some(set) = index.buckets.get(&bucket) {
                        keys.extend(set.iter());
                    }
                }
                keys.into_iter().filter_map(|k| inner.objects.get(k)).collect()
            }
            None => inner
                .objects
                .values()
                .filter(|obj| match &opts.namespace {
                    Some(ns) => &obj.meta.namespace == ns,
                    None => true,
                })
                .collect(),
        };

        let mut out: Vec<RawObject> = candidates
            .into_iter()
            .filter(|obj| match &opts.label_selector {
                Some(sel) => sel.matches(&obj.meta),
                None => true,
            })
            .cloned()
            .collect();

        // Deterministic order for callers and tests
        out.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));
        Ok(out)
    }

    /// Raw index lookup: objects whose `index` extracted `value`, optionally
    /// restricted to one namespace.
    pub fn by_index(&self, index: &str, namespace: Option<&str>, value: &str) -> Result<Vec<RawObject>> {
        let inner = self.inner.read();
        let idx = inner.indexes.get(index).ok_or_else(|| CacheError::UnknownIndex {
            field: index.to_string(),
        })?;
        let mut out = Vec::new();
        for bucket in lookup_keys(namespace, value) {
            if let Some(set) = idx.buckets.get(&bucket) {
                out.extend(set.iter().filter_map(|k| inner.objects.get(k)).cloned());
            }
        }
        out.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));
        Ok(out)
    }
}
