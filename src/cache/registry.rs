//! Lazily-constructed map of watch sessions, one per resource type.
//!
//! Sessions are created exactly once per type key (double-checked under a
//! reader/writer lock), started in bulk by `start`, and started immediately
//! on creation when the registry is already running. They are never torn
//! down individually; the stop signal tears the whole registry down.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;

use crate::cache::WatchSession;
use crate::client::BindingFactory;
use crate::config::CacheSettings;
use crate::resource::TypeKey;
use crate::CacheError;
use crate::Result;

struct RegistryInner {
    sessions: HashMap<TypeKey, Arc<WatchSession>>,
    started: bool,
    shutdown: Option<CancellationToken>,
}

pub struct SessionRegistry {
    factory: Arc<dyn BindingFactory>,
    inner: RwLock<RegistryInner>,
    settings: CacheSettings,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn BindingFactory>, settings: CacheSettings) -> Self {
        Self {
            factory,
            inner: RwLock::new(RegistryInner {
                sessions: HashMap::new(),
                started: false,
                shutdown: None,
            }),
            settings,
        }
    }

    /// Returns the session for `type_key`, creating it on first access.
    ///
    /// When the registry is already running, a newly created session is
    /// launched immediately and this call blocks until its initial sync,
    /// failing on timeout or shutdown. Already-known types return without
    /// blocking.
    pub async fn get(&self, type_key: &TypeKey) -> Result<Arc<WatchSession>> {
        // Fast path: read lock only
        if let Some(session) = self.inner.read().sessions.get(type_key) {
            return Ok(session.clone());
        }

        let (session, launched) = {
            let mut inner = self.inner.write();
            // Re-check: another caller may have raced ahead
            if let Some(session) = inner.sessions.get(type_key) {
                (session.clone(), None)
            } else {
                let binding = self.factory.binding_for(type_key)?;
                let session = Arc::new(WatchSession::new(
                    type_key.clone(),
                    binding,
                    self.settings.clone(),
                ));
                inner.sessions.insert(type_key.clone(), session.clone());
                debug!("registered watch session for {}", type_key);

                if inner.started {
                    let shutdown = inner
                        .shutdown
                        .clone()
                        .unwrap_or_else(CancellationToken::new);
                    tokio::spawn(session.clone().run(shutdown.clone()));
                    (session, Some(shutdown))
                } else {
                    (session, None)
                }
            }
        };

        if let Some(shutdown) = launched {
            self.await_first_sync(&session, &shutdown).await?;
        }
        Ok(session)
    }

    async fn await_first_sync(
        &self,
        session: &Arc<WatchSession>,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        let type_key = session.type_key().clone();
        let timeout = self.settings.sync_timeout();
        let mut synced = session.synced_signal();

        tokio::select! {
            _ = shutdown.cancelled() => {
                Err(CacheError::SyncAborted { type_key }.into())
            }
            r = tokio::time::timeout(timeout, synced.wait_for(|v| *v)) => match r {
                Ok(Ok(_)) => Ok(()),
                // The sender half lives in the session; it only drops with it
                Ok(Err(_)) => Err(CacheError::SyncAborted { type_key }.into()),
                Err(_) => Err(CacheError::SyncTimeout { type_key, waited: timeout }.into()),
            },
        }
    }

    /// Launches every currently-registered session, marks the registry
    /// started, then blocks until the stop signal fires.
    pub async fn start(&self, shutdown: CancellationToken) {
        {
            let mut inner = self.inner.write();
            for session in inner.sessions.values() {
                tokio::spawn(session.clone().run(shutdown.clone()));
            }
            inner.started = true;
            inner.shutdown = Some(shutdown.clone());
            info!("session registry started with {} session(s)", inner.sessions.len());
        }

        shutdown.cancelled().await;
    }

    /// Blocks until every currently-registered session has synced; false if
    /// the stop signal fires first.
    pub async fn wait_for_sync(&self, shutdown: &CancellationToken) -> bool {
        let signals: Vec<_> = {
            let inner = self.inner.read();
            inner.sessions.values().map(|s| s.synced_signal()).collect()
        };

        for mut signal in signals {
            tokio::select! {
                _ = shutdown.cancelled() => return false,
                r = signal.wait_for(|v| *v) => {
                    if r.is_err() {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn is_started(&self) -> bool {
        self.inner.read().started
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}
