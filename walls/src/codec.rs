//! Compat reader and writer for persisted / broadcast records.
//!
//! SCHEMA
//! ======
//! Canonical shape is `{"images": {...}, "updatedAt": <ms>}` with reference
//! sizes at entry level. Readers also accept:
//! - a bare image map (no wrapper), read with `updatedAt = 0` so it never
//!   wins a timestamp comparison;
//! - reference sizes nested inside `transform` (lifted by the sanitizer).
//!
//! Writers only ever emit the canonical shape.

use serde_json::Value;

use crate::model::SyncedRecord;
use crate::sanitize::sanitize_images;

#[cfg(test)]
#[path = "codec_test.rs"]
mod tests;

/// Key carrying the serialized record inside a tab message.
pub const TAB_RAW_KEY: &str = "raw";

/// Read a timestamp from a JSON number. Fractional values are truncated.
#[must_use]
pub fn timestamp(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let float = value.as_f64().filter(|f| f.is_finite())?;
    #[allow(clippy::cast_possible_truncation)]
    Some(float.trunc() as i64)
}

/// Read any historical record shape from an already-parsed value.
#[must_use]
pub fn read_record(value: &Value) -> SyncedRecord {
    match value.as_object() {
        Some(map) if map.contains_key("images") => SyncedRecord {
            images: map.get("images").map(sanitize_images).unwrap_or_default(),
            updated_at: map.get("updatedAt").and_then(timestamp).unwrap_or(0),
        },
        _ => SyncedRecord { images: sanitize_images(value), updated_at: 0 },
    }
}

/// Parse a stored string. `None` when the text is not JSON at all.
#[must_use]
pub fn parse_stored(raw: &str) -> Option<SyncedRecord> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Some(read_record(&value)),
        Err(_) => None,
    }
}

/// Serialize a record in the canonical shape.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_record(record: &SyncedRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}

/// Wrap a record for the tab channel as `{"raw": "<serialized record>"}`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode_tab_payload(record: &SyncedRecord) -> Result<Value, serde_json::Error> {
    let raw = encode_record(record)?;
    Ok(serde_json::json!({ TAB_RAW_KEY: raw }))
}

/// Decode a tab message. Senders have used three shapes over time: the raw
/// serialized string, `{"raw": "..."}`, and the record (or bare map) itself.
#[must_use]
pub fn decode_tab_payload(payload: &Value) -> Option<SyncedRecord> {
    match payload {
        Value::String(raw) => parse_stored(raw),
        Value::Object(map) => match map.get(TAB_RAW_KEY) {
            Some(Value::String(raw)) => parse_stored(raw),
            _ => Some(read_record(payload)),
        },
        _ => None,
    }
}
