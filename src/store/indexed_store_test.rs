use std::sync::Arc;

use crate::resource::ObjectKey;
use crate::resource::RawObject;
use crate::store::FieldSelector;
use crate::store::IndexedStore;
use crate::store::LabelSelector;
use crate::store::ListOptions;
use crate::store::NAMESPACE_INDEX;
use crate::test_utils::raw_widget;
use crate::CacheError;
use crate::Error;

fn label_extractor(label: &'static str) -> crate::store::IndexExtractor {
    Arc::new(move |obj: &RawObject| {
        obj.meta
            .labels
            .get(label)
            .map(|v| vec![v.clone()])
            .unwrap_or_default()
    })
}

#[test]
fn test_get_and_upsert() {
    let store = IndexedStore::new();
    assert!(store.is_empty());

    let a = raw_widget("a", "x", &[]);
    assert!(store.upsert(a.clone()).is_none());
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&ObjectKey::new("x", "a")), Some(a.clone()));

    // Replacing returns the previous revision
    let mut a2 = a.clone();
    a2.meta.resource_version = "2".to_string();
    assert_eq!(store.upsert(a2.clone()), Some(a));
    assert_eq!(store.get(&ObjectKey::new("x", "a")), Some(a2));
}

#[test]
fn test_duplicate_index_name_is_rejected() {
    let store = IndexedStore::new();
    let r = store.add_index(NAMESPACE_INDEX, label_extractor("ignored"));
    assert!(matches!(
        r,
        Err(Error::Cache(CacheError::IndexExists { .. }))
    ));
}

#[test]
fn test_namespaced_and_global_index_lookup() {
    let store = IndexedStore::new();
    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    store.upsert(raw_widget("a", "x", &[("label", "L1")]));
    store.upsert(raw_widget("b", "y", &[("label", "L1")]));

    // Restricted to namespace x: only a
    let scoped = store.by_index("label", Some("x"), "L1").expect("lookup");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].meta.name, "a");

    // Unrestricted: both
    let global = store.by_index("label", None, "L1").expect("lookup");
    let names: Vec<_> = global.iter().map(|o| o.meta.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_cluster_scoped_objects_share_the_index() {
    let store = IndexedStore::new();
    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    // Empty namespace means cluster-scoped
    store.upsert(raw_widget("global", "", &[("label", "L1")]));
    store.upsert(raw_widget("a", "x", &[("label", "L1")]));

    let all = store.by_index("label", None, "L1").expect("lookup");
    assert_eq!(all.len(), 2);

    // A namespace-restricted query does not see cluster-scoped objects
    let scoped = store.by_index("label", Some("x"), "L1").expect("lookup");
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].meta.name, "a");
}

#[test]
fn test_index_registered_late_covers_existing_objects() {
    let store = IndexedStore::new();
    store.upsert(raw_widget("a", "x", &[("label", "L1")]));

    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    let hits = store.by_index("label", Some("x"), "L1").expect("lookup");
    assert_eq!(hits.len(), 1);
}

#[test]
fn test_update_moves_index_buckets() {
    let store = IndexedStore::new();
    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    store.upsert(raw_widget("a", "x", &[("label", "L1")]));
    let mut moved = raw_widget("a", "x", &[("label", "L2")]);
    moved.meta.resource_version = "2".to_string();
    store.upsert(moved);

    assert!(store.by_index("label", Some("x"), "L1").expect("lookup").is_empty());
    assert_eq!(store.by_index("label", Some("x"), "L2").expect("lookup").len(), 1);
}

#[test]
fn test_remove_purges_every_index() {
    let store = IndexedStore::new();
    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    store.upsert(raw_widget("a", "x", &[("label", "L1")]));
    assert!(store.remove(&ObjectKey::new("x", "a")).is_some());

    assert!(store.get(&ObjectKey::new("x", "a")).is_none());
    assert!(store.by_index("label", Some("x"), "L1").expect("lookup").is_empty());
    assert!(store.by_index(NAMESPACE_INDEX, None, "x").expect("lookup").is_empty());
    // Removing again is a no-op
    assert!(store.remove(&ObjectKey::new("x", "a")).is_none());
}

#[test]
fn test_list_with_selectors() {
    let store = IndexedStore::new();
    store
        .add_index("label", label_extractor("label"))
        .expect("register index");

    store.upsert(raw_widget("a", "x", &[("label", "L1")]));
    store.upsert(raw_widget("b", "y", &[("label", "L1")]));
    store.upsert(raw_widget("c", "x", &[("label", "L2")]));

    // Namespace restriction only
    let in_x = store.list(&ListOptions::in_namespace("x")).expect("list");
    assert_eq!(in_x.len(), 2);

    // Field selector restricted to namespace x
    let opts = ListOptions::in_namespace("x").with_field(FieldSelector::new("label", "L1"));
    let hits = store.list(&opts).expect("list");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].meta.name, "a");

    // Field selector across all namespaces
    let opts = ListOptions::default().with_field(FieldSelector::new("label", "L1"));
    let hits = store.list(&opts).expect("list");
    assert_eq!(hits.len(), 2);

    // Label selector combines with namespace
    let opts = ListOptions::in_namespace("x").with_labels(LabelSelector::new().with("label", "L2"));
    let hits = store.list(&opts).expect("list");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].meta.name, "c");

    // Unknown field index fails
    let opts = ListOptions::default().with_field(FieldSelector::new("nope", "v"));
    assert!(matches!(
        store.list(&opts),
        Err(Error::Cache(CacheError::UnknownIndex { .. }))
    ));
}
