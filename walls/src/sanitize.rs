//! Validation boundary for untrusted wall state.
//!
//! Every byte that reaches the orchestrator or the server from storage, the
//! network, or another tab passes through here first. Nothing in this module
//! returns an error: malformed input degrades to omission or defaults.

use serde_json::{Map, Value};

use crate::model::{Transform, WallEntry, WallId, WallImageState};

#[cfg(test)]
#[path = "sanitize_test.rs"]
mod tests;

/// Build canonical state from an arbitrary JSON value.
///
/// Only known wall keys are read. An entry survives only if `src` is a
/// non-empty string; transform components fall back to identity values.
#[must_use]
pub fn sanitize_images(value: &Value) -> WallImageState {
    let Some(map) = value.as_object() else {
        return WallImageState::new();
    };

    WallId::ALL
        .into_iter()
        .filter_map(|id| {
            let entry = map.get(id.as_str())?.as_object()?;
            sanitize_entry(entry).map(|entry| (id, entry))
        })
        .collect()
}

fn sanitize_entry(entry: &Map<String, Value>) -> Option<WallEntry> {
    let src = entry.get("src").and_then(Value::as_str).filter(|src| !src.is_empty())?;
    let transform = entry.get("transform").and_then(Value::as_object);
    let field = |key: &str| transform.and_then(|t| t.get(key));

    // Older records kept the reference size inside `transform`.
    let ref_width = positive(entry.get("refWidth")).or_else(|| positive(field("refWidth")));
    let ref_height = positive(entry.get("refHeight")).or_else(|| positive(field("refHeight")));

    Some(WallEntry {
        src: src.to_owned(),
        transform: Transform {
            x: coerce_number(field("x")),
            y: coerce_number(field("y")),
            scale: positive(field("scale")).filter(|s| s.is_finite()).unwrap_or(1.0),
            rotation: field("rotation")
                .and_then(Value::as_f64)
                .filter(|r| r.is_finite())
                .unwrap_or(0.0),
        },
        ref_width,
        ref_height,
    })
}

/// Loose numeric coercion for translation offsets. Anything that does not
/// yield a finite number becomes 0.
fn coerce_number(value: Option<&Value>) -> f64 {
    let coerced = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Bool(flag)) => f64::from(u8::from(*flag)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() { 0.0 } else { trimmed.parse::<f64>().unwrap_or(0.0) }
        }
        Some(Value::Array(_) | Value::Object(_)) => 0.0,
    };
    if coerced.is_finite() { coerced } else { 0.0 }
}

fn positive(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|n| *n > 0.0)
}

/// Re-apply the canonical rules to already-typed state.
///
/// Typed state can still carry values the wire format cannot, such as an
/// empty `src` or a non-finite scale produced by a gesture.
#[must_use]
pub fn sanitize_state(state: &WallImageState) -> WallImageState {
    state
        .iter()
        .filter(|(_, entry)| !entry.src.is_empty())
        .map(|(id, entry)| {
            let t = entry.transform;
            let cleaned = WallEntry {
                src: entry.src.clone(),
                transform: Transform {
                    x: finite_or(t.x, 0.0),
                    y: finite_or(t.y, 0.0),
                    scale: if t.scale.is_finite() && t.scale > 0.0 { t.scale } else { 1.0 },
                    rotation: finite_or(t.rotation, 0.0),
                },
                ref_width: entry.ref_width.filter(|w| *w > 0.0 && w.is_finite()),
                ref_height: entry.ref_height.filter(|h| *h > 0.0 && h.is_finite()),
            };
            (*id, cleaned)
        })
        .collect()
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}
