//! `/api/wall-state`: read and conditionally replace the shared record.
//!
//! POST bodies arrive as raw bytes. Malformed input is answered with a
//! `400 {ok:false, error}` body: `"parse error"` or `"invalid payload"`.

use std::num::FpCategory;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use walls::SyncedRecord;
use walls::codec::timestamp;
use walls::sanitize::sanitize_images;

use crate::state::AppState;

#[cfg(test)]
#[path = "wall_state_test.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("parse error")]
    Parse,
    #[error("invalid payload")]
    Invalid,
}

impl IntoResponse for PayloadError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveAck {
    pub ok: bool,
    pub applied: bool,
}

/// Validate a POST body and sanitize its images.
///
/// # Errors
///
/// `Parse` when the body is not JSON; `Invalid` when it is not an object,
/// `updatedAt` is not a number, or `images` is missing or falsy (`null`,
/// `false`, `0`, `""`).
pub fn parse_payload(body: &[u8]) -> Result<SyncedRecord, PayloadError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| PayloadError::Parse)?;
    let object = value.as_object().ok_or(PayloadError::Invalid)?;

    let updated_at = object
        .get("updatedAt")
        .filter(|v| v.is_number())
        .and_then(timestamp)
        .ok_or(PayloadError::Invalid)?;

    let images = match object.get("images") {
        Some(images) if !is_falsy(images) => sanitize_images(images),
        _ => return Err(PayloadError::Invalid),
    };

    Ok(SyncedRecord::new(images, updated_at))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64().is_some_and(|f| f.classify() == FpCategory::Zero),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

pub async fn get_wall_state(State(state): State<AppState>) -> Json<SyncedRecord> {
    Json(state.snapshot().await)
}

pub async fn post_wall_state(State(state): State<AppState>, body: Bytes) -> Result<Json<SaveAck>, PayloadError> {
    let record = parse_payload(&body).inspect_err(|e| debug!(error = %e, size = body.len(), "rejected wall state"))?;
    let updated_at = record.updated_at;
    let walls = record.images.len();

    let applied = state.apply(record).await;
    if applied {
        info!(updated_at, walls, "wall state replaced");
    } else {
        debug!(updated_at, "stale wall state ignored");
    }
    Ok(Json(SaveAck { ok: true, applied }))
}
