//! Error hierarchy for the watch cache and reconciliation engine,
//! categorized by subsystem and operational concern.

use std::time::Duration;

use config::ConfigError;

use crate::resource::ObjectKey;
use crate::resource::TypeKey;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local cache and watch-session failures
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Controller setup and dispatch failures
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Remote store binding failures
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Settings loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// No object with this key in the type's local store
    #[error("object {key} of type {type_key} not found")]
    NotFound { type_key: TypeKey, key: ObjectKey },

    /// A lazily-created session did not reach its first sync in time
    #[error("session for {type_key} failed to sync within {waited:?}")]
    SyncTimeout { type_key: TypeKey, waited: Duration },

    /// The stop signal fired while waiting for a session's first sync
    #[error("session sync for {type_key} aborted by shutdown")]
    SyncAborted { type_key: TypeKey },

    /// Index names are unique per resource type
    #[error("index {name} already registered")]
    IndexExists { name: String },

    /// A field selector referenced a field with no registered index
    #[error("no index registered for field {field}")]
    UnknownIndex { field: String },

    /// A typed read could not decode the cached payload
    #[error("failed to decode cached object: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A resource type may be registered with a controller at most once
    #[error("type {type_key} is already watched by controller {name}")]
    AlreadyWatched { name: String, type_key: TypeKey },
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The binding factory has no list/watch mapping for this type
    #[error("no list/watch binding for type {type_key}")]
    UnmappedType { type_key: TypeKey },

    /// The remote store rejected or failed a list/watch call
    #[error("list/watch call failed: {0}")]
    ListWatch(String),

    /// A mutation against the remote store failed
    #[error("write to remote store failed: {0}")]
    Write(String),
}
