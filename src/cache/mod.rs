//! Read-path façade: typed `get`/`list` served from per-type watch-session
//! caches, created lazily on first touch.

mod registry;
mod session;

pub use registry::*;
pub use session::*;


use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::BindingFactory;
use crate::config::CacheSettings;
use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::resource::Resource;
use crate::resource::TypeKey;
use crate::store::IndexExtractor;
use crate::store::ListOptions;
use crate::CacheError;
use crate::Result;

/// Client-side cache over a remote resource store.
///
/// Reads go to the local indexed store of the type's watch session; the
/// first read of an unseen type creates (and, on a started cache, syncs)
/// that session before returning.
pub struct ResourceCache {
    registry: Arc<SessionRegistry>,
}

impl ResourceCache {
    pub fn new(factory: Arc<dyn BindingFactory>, settings: CacheSettings) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new(factory, settings)),
        }
    }

    /// Typed read by key. `CacheError::NotFound` when absent.
    pub async fn get<T: Resource>(&self, key: &ObjectKey) -> Result<T> {
        let raw = self.get_raw(&T::type_key(), key).await?;
        T::from_raw(&raw)
    }

    pub async fn get_raw(&self, type_key: &TypeKey, key: &ObjectKey) -> Result<RawObject> {
        let session = self.registry.get(type_key).await?;
        session.store().get(key).ok_or_else(|| {
            CacheError::NotFound {
                type_key: type_key.clone(),
                key: key.clone(),
            }
            .into()
        })
    }

    /// Typed filtered list. The element type parameter selects the session;
    /// there is no separate collection shape.
    pub async fn list<T: Resource>(&self, opts: &ListOptions) -> Result<Vec<T>> {
        let raws = self.list_raw(&T::type_key(), opts).await?;
        raws.iter().map(T::from_raw).collect()
    }

    pub async fn list_raw(&self, type_key: &TypeKey, opts: &ListOptions) -> Result<Vec<RawObject>> {
        let session = self.registry.get(type_key).await?;
        session.store().list(opts)
    }

    /// The watch session for a type, creating it on first access.
    pub async fn session(&self, type_key: &TypeKey) -> Result<Arc<WatchSession>> {
        self.registry.get(type_key).await
    }

    /// Registers a named field extractor on the type's store so list reads
    /// can use field selectors over it. Duplicate names fail fast.
    pub async fn index_field(
        &self,
        type_key: &TypeKey,
        field: &str,
        extractor: IndexExtractor,
    ) -> Result<()> {
        let session = self.registry.get(type_key).await?;
        session.store().add_index(field, extractor)
    }

    /// Launches all sessions and blocks until the stop signal fires.
    pub async fn start(&self, shutdown: CancellationToken) {
        self.registry.start(shutdown).await;
    }

    /// True when every currently-registered session has synced; false if the
    /// stop signal fires first.
    pub async fn wait_for_sync(&self, shutdown: &CancellationToken) -> bool {
        self.registry.wait_for_sync(shutdown).await
    }

    pub(crate) fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}
