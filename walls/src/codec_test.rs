use super::*;
use crate::model::{WallEntry, WallId, WallImageState};
use serde_json::json;

fn sample_record() -> SyncedRecord {
    let mut images = WallImageState::new();
    images.insert(WallId::W1, WallEntry::new("data:image/png;base64,AA"));
    SyncedRecord::new(images, 1_700_000_000_000)
}

#[test]
fn timestamp_reads_integers_and_truncates_floats() {
    assert_eq!(timestamp(&json!(100)), Some(100));
    assert_eq!(timestamp(&json!(100.9)), Some(100));
    assert_eq!(timestamp(&json!(-5)), Some(-5));
    assert_eq!(timestamp(&json!("100")), None);
    assert_eq!(timestamp(&json!(null)), None);
}

#[test]
fn wrapped_record_is_read_with_timestamp() {
    let record = read_record(&json!({"images": {"W2": {"src": "x"}}, "updatedAt": 77}));
    assert_eq!(record.updated_at, 77);
    assert!(record.images.contains_key(&WallId::W2));
}

#[test]
fn wrapped_record_without_numeric_timestamp_reads_zero() {
    let record = read_record(&json!({"images": {"W2": {"src": "x"}}, "updatedAt": "77"}));
    assert_eq!(record.updated_at, 0);
    assert_eq!(record.images.len(), 1);
}

#[test]
fn bare_map_reads_with_zero_timestamp() {
    let record = read_record(&json!({"W4": {"src": "legacy"}}));
    assert_eq!(record.updated_at, 0);
    assert_eq!(record.images.get(&WallId::W4).map(|e| e.src.as_str()), Some("legacy"));
}

#[test]
fn parse_stored_rejects_non_json() {
    assert!(parse_stored("{not json").is_none());
    assert!(parse_stored("").is_none());
}

#[test]
fn parse_stored_reads_canonical_output() {
    let record = sample_record();
    let raw = encode_record(&record).unwrap();
    assert_eq!(parse_stored(&raw), Some(record));
}

#[test]
fn tab_payload_wraps_raw_string() {
    let payload = encode_tab_payload(&sample_record()).unwrap();
    assert!(payload.get(TAB_RAW_KEY).and_then(Value::as_str).is_some());
}

#[test]
fn decode_tab_payload_accepts_every_sender_shape() {
    let record = sample_record();
    let raw = encode_record(&record).unwrap();

    let wrapped = decode_tab_payload(&json!({ "raw": raw.clone() })).unwrap();
    assert_eq!(wrapped, record);

    let bare_string = decode_tab_payload(&Value::String(raw)).unwrap();
    assert_eq!(bare_string, record);

    let object = decode_tab_payload(&serde_json::to_value(&record).unwrap()).unwrap();
    assert_eq!(object, record);

    let bare_state = decode_tab_payload(&json!({"W1": {"src": "a"}})).unwrap();
    assert_eq!(bare_state.updated_at, 0);
}

#[test]
fn decode_tab_payload_ignores_scalars() {
    assert!(decode_tab_payload(&json!(5)).is_none());
    assert!(decode_tab_payload(&json!(null)).is_none());
    assert!(decode_tab_payload(&json!("garbage")).is_none());
}
