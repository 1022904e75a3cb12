#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn wall_id_parses_case_insensitively() {
    assert_eq!("W3".parse::<WallId>(), Ok(WallId::W3));
    assert_eq!(" w5 ".parse::<WallId>(), Ok(WallId::W5));
}

#[test]
fn wall_id_rejects_unknown() {
    let err = "W6".parse::<WallId>().unwrap_err();
    assert_eq!(err.to_string(), "unknown wall id: W6");
}

#[test]
fn wall_id_serializes_as_literal() {
    let json = serde_json::to_string(&WallId::W2).unwrap();
    assert_eq!(json, "\"W2\"");
}

#[test]
fn transform_default_is_identity() {
    let t = Transform::default();
    assert_eq!(t, Transform { x: 0.0, y: 0.0, scale: 1.0, rotation: 0.0 });
}

#[test]
fn merged_overwrites_only_present_fields() {
    let base = Transform { x: 10.0, y: 20.0, scale: 1.5, rotation: 45.0 };
    let merged = base.merged(&TransformPatch::scale(2.0));
    assert_eq!(merged, Transform { x: 10.0, y: 20.0, scale: 2.0, rotation: 45.0 });
}

#[test]
fn empty_patch_reports_empty() {
    assert!(TransformPatch::default().is_empty());
    assert!(!TransformPatch::rotation(1.0).is_empty());
}

#[test]
fn entry_serializes_camel_case_ref_sizes() {
    let entry = WallEntry::new("a").with_panel(Some(PanelSize::new(640.0, 180.0)));
    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["refWidth"], 640.0);
    assert_eq!(value["refHeight"], 180.0);
}

#[test]
fn entry_omits_absent_ref_sizes() {
    let value = serde_json::to_value(WallEntry::new("a")).unwrap();
    let map = value.as_object().unwrap();
    assert!(!map.contains_key("refWidth"));
    assert!(!map.contains_key("refHeight"));
}

#[test]
fn ref_size_requires_both_sides() {
    let mut entry = WallEntry::new("a");
    entry.ref_width = Some(100.0);
    assert!(entry.ref_size().is_none());
    entry.ref_height = Some(50.0);
    assert_eq!(entry.ref_size(), Some(PanelSize::new(100.0, 50.0)));
}

#[test]
fn record_serializes_updated_at_camel_case() {
    let record = SyncedRecord::new(WallImageState::new(), 42);
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value, serde_json::json!({"images": {}, "updatedAt": 42}));
}

#[test]
fn supersedes_is_strict() {
    let record = SyncedRecord::new(WallImageState::new(), 100);
    assert!(record.supersedes(99));
    assert!(!record.supersedes(100));
    assert!(!record.supersedes(101));
}

#[test]
fn replace_if_newer_keeps_higher_timestamp() {
    let mut images = WallImageState::new();
    images.insert(WallId::W1, WallEntry::new("a"));
    let mut stored = SyncedRecord::new(images, 100);

    assert!(!stored.replace_if_newer(SyncedRecord::new(WallImageState::new(), 50)));
    assert!(!stored.replace_if_newer(SyncedRecord::new(WallImageState::new(), 100)));
    assert_eq!(stored.updated_at, 100);
    assert_eq!(stored.images.len(), 1);

    assert!(stored.replace_if_newer(SyncedRecord::new(WallImageState::new(), 101)));
    assert_eq!(stored.updated_at, 101);
    assert!(stored.images.is_empty());
}
