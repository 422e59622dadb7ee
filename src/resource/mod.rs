//! Core object model: type keys, object metadata and the dynamic object
//! representation that flows through stores, sessions and event channels.
//!
//! The engine is payload-agnostic. Objects travel as [`RawObject`] (metadata
//! plus an opaque JSON payload); the [`Resource`] trait layers typed access
//! on top for application code.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::CacheError;
use crate::Result;

#[cfg(test)]
mod resource_test;

/// Identifies a resource schema (group, version, kind). Used as the
/// registry's map key; equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeKey {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl TypeKey {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

/// Identity of one object: primary store key.
///
/// Cluster-scoped objects carry an empty namespace. Keys order by namespace
/// first, then name, so ordered collections group per namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Object metadata shared by every stored object.
///
/// `resource_version` is the change-detection marker assigned by the remote
/// store; the engine only ever compares it for equality.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }
}

/// Dynamic (type-erased) object representation.
///
/// This is what watch sessions store and what events carry; the payload is
/// opaque to the engine and only decoded at the typed façade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObject {
    pub type_key: TypeKey,
    pub meta: ObjectMeta,
    pub payload: serde_json::Value,
}

impl RawObject {
    pub fn key(&self) -> ObjectKey {
        self.meta.key()
    }
}

/// Typed layer over [`RawObject`].
///
/// Implementors declare their schema's [`TypeKey`] and expose their metadata;
/// conversion through the JSON payload is provided.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn type_key() -> TypeKey;

    fn object_meta(&self) -> &ObjectMeta;

    fn to_raw(&self) -> Result<RawObject> {
        let payload = serde_json::to_value(self).map_err(CacheError::Decode)?;
        Ok(RawObject {
            type_key: Self::type_key(),
            meta: self.object_meta().clone(),
            payload,
        })
    }

    fn from_raw(raw: &RawObject) -> Result<Self> {
        let obj = serde_json::from_value(raw.payload.clone()).map_err(CacheError::Decode)?;
        Ok(obj)
    }
}
