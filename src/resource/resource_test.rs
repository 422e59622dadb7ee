use std::collections::BTreeMap;

use crate::resource::ObjectKey;
use crate::resource::ObjectMeta;
use crate::resource::Resource;
use crate::resource::TypeKey;
use crate::test_utils::TestWidget;

#[test]
fn test_type_key_display_and_equality() {
    let a = TypeKey::new("apps", "v1", "Widget");
    let b = TypeKey::new("apps", "v1", "Widget");
    let c = TypeKey::new("apps", "v2", "Widget");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.to_string(), "apps/v1/Widget");
}

#[test]
fn test_object_key_from_meta() {
    let meta = ObjectMeta {
        name: "a".to_string(),
        namespace: "x".to_string(),
        ..Default::default()
    };
    assert_eq!(meta.key(), ObjectKey::new("x", "a"));
    assert_eq!(meta.key().to_string(), "x/a");
}

#[test]
fn test_object_keys_order_namespace_first() {
    let mut keys = vec![
        ObjectKey::new("y", "a"),
        ObjectKey::new("x", "b"),
        ObjectKey::new("x", "a"),
        ObjectKey::new("", "cluster"),
    ];
    keys.sort();
    assert_eq!(
        keys,
        vec![
            ObjectKey::new("", "cluster"),
            ObjectKey::new("x", "a"),
            ObjectKey::new("x", "b"),
            ObjectKey::new("y", "a"),
        ]
    );

    // Usable as an ordered map key
    let mut map = std::collections::BTreeMap::new();
    map.insert(ObjectKey::new("x", "a"), 1);
    map.insert(ObjectKey::new("x", "b"), 2);
    assert_eq!(map.get(&ObjectKey::new("x", "a")), Some(&1));
    assert_eq!(map.remove(&ObjectKey::new("x", "b")), Some(2));
}

#[test]
fn test_typed_round_trip_through_raw() {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), "demo".to_string());
    let widget = TestWidget {
        meta: ObjectMeta {
            name: "a".to_string(),
            namespace: "x".to_string(),
            resource_version: "1".to_string(),
            labels,
        },
        color: "blue".to_string(),
        size: 3,
    };

    let raw = widget.to_raw().expect("encode should succeed");
    assert_eq!(raw.type_key, TestWidget::type_key());
    assert_eq!(raw.meta.name, "a");

    let back = TestWidget::from_raw(&raw).expect("decode should succeed");
    assert_eq!(back, widget);
}

#[test]
fn test_from_raw_rejects_foreign_payload() {
    let raw = crate::resource::RawObject {
        type_key: TestWidget::type_key(),
        meta: ObjectMeta {
            name: "a".to_string(),
            ..Default::default()
        },
        payload: serde_json::json!({"unexpected": true}),
    };
    assert!(TestWidget::from_raw(&raw).is_err());
}
