use std::collections::BTreeMap;

use crate::resource::ObjectMeta;

/// Equality-set label selector: every entry must match the object's labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn matches(&self, meta: &ObjectMeta) -> bool {
        self.0
            .iter()
            .all(|(k, v)| meta.labels.get(k).map(|lv| lv == v).unwrap_or(false))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Selects objects whose registered field index extracted `value`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSelector {
    pub field: String,
    pub value: String,
}

impl FieldSelector {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Options for a list read.
///
/// A `None` namespace means all namespaces; selectors combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub namespace: Option<String>,
    pub label_selector: Option<LabelSelector>,
    pub field_selector: Option<FieldSelector>,
}

impl ListOptions {
    pub fn in_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            ..Default::default()
        }
    }

    pub fn with_labels(mut self, selector: LabelSelector) -> Self {
        self.label_selector = Some(selector);
        self
    }

    pub fn with_field(mut self, selector: FieldSelector) -> Self {
        self.field_selector = Some(selector);
        self
    }
}
