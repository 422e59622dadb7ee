use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::resource::ObjectMeta;
use crate::resource::RawObject;
use crate::resource::Resource;
use crate::resource::TypeKey;

/// Minimal namespaced resource used across the test suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestWidget {
    pub meta: ObjectMeta,
    pub color: String,
    pub size: u32,
}

impl Resource for TestWidget {
    fn type_key() -> TypeKey {
        TypeKey::new("testing", "v1", "Widget")
    }

    fn object_meta(&self) -> &ObjectMeta {
        &self.meta
    }
}

pub fn widget_type() -> TypeKey {
    TestWidget::type_key()
}

/// A gadget type with no binding registered anywhere, for unmapped-type
/// error cases.
pub fn unmapped_type() -> TypeKey {
    TypeKey::new("testing", "v1", "Gadget")
}

/// Builds a raw widget whose payload decodes back into [`TestWidget`].
pub fn raw_widget(name: &str, ns: &str, labels: &[(&str, &str)]) -> RawObject {
    let mut label_map = BTreeMap::new();
    for (k, v) in labels {
        label_map.insert((*k).to_string(), (*v).to_string());
    }
    let widget = TestWidget {
        meta: ObjectMeta {
            name: name.to_string(),
            namespace: ns.to_string(),
            resource_version: "1".to_string(),
            labels: label_map,
        },
        color: "blue".to_string(),
        size: 1,
    };
    widget.to_raw().expect("widget payload encodes")
}
