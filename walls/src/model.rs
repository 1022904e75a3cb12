//! Plain data for wall imagery.
//!
//! DESIGN
//! ======
//! Everything here is a value type. Canonical invariants (non-empty `src`,
//! positive finite scale, positive ref sizes) are enforced by
//! [`crate::sanitize`], not by constructors, so untrusted input can always be
//! represented long enough to be cleaned.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

// =============================================================================
// WALL ID
// =============================================================================

/// One of the fixed display panels in this deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallId {
    W1,
    W2,
    W3,
    W4,
    W5,
}

impl WallId {
    /// Every wall, in display order.
    pub const ALL: [WallId; 5] = [WallId::W1, WallId::W2, WallId::W3, WallId::W4, WallId::W5];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W1 => "W1",
            Self::W2 => "W2",
            Self::W3 => "W3",
            Self::W4 => "W4",
            Self::W5 => "W5",
        }
    }
}

impl fmt::Display for WallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown wall id: {0}")]
pub struct UnknownWall(pub String);

impl FromStr for WallId {
    type Err = UnknownWall;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WallId::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownWall(s.to_owned()))
    }
}

// =============================================================================
// TRANSFORM
// =============================================================================

/// Translation (panel pixels), scale factor and rotation (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform { x: 0.0, y: 0.0, scale: 1.0, rotation: 0.0 };

    /// Overwrite the fields present in `patch`.
    #[must_use]
    pub fn merged(self, patch: &TransformPatch) -> Self {
        Self {
            x: patch.x.unwrap_or(self.x),
            y: patch.y.unwrap_or(self.y),
            scale: patch.scale.unwrap_or(self.scale),
            rotation: patch.rotation.unwrap_or(self.rotation),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Partial transform update. Absent fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
}

impl TransformPatch {
    #[must_use]
    pub fn translate(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }

    #[must_use]
    pub fn scale(scale: f64) -> Self {
        Self { scale: Some(scale), ..Self::default() }
    }

    #[must_use]
    pub fn rotation(rotation: f64) -> Self {
        Self { rotation: Some(rotation), ..Self::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.scale.is_none() && self.rotation.is_none()
    }
}

// =============================================================================
// ENTRIES AND RECORDS
// =============================================================================

/// Pixel size of a panel as displayed at the moment a transform was authored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanelSize {
    pub width: f64,
    pub height: f64,
}

impl PanelSize {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Image placed on one wall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallEntry {
    /// Image reference: a `data:` URI, a `blob:` handle, or a URL.
    pub src: String,
    pub transform: Transform,
    #[serde(rename = "refWidth", default, skip_serializing_if = "Option::is_none")]
    pub ref_width: Option<f64>,
    #[serde(rename = "refHeight", default, skip_serializing_if = "Option::is_none")]
    pub ref_height: Option<f64>,
}

impl WallEntry {
    /// Fresh entry with the identity transform and no reference size.
    #[must_use]
    pub fn new(src: impl Into<String>) -> Self {
        Self { src: src.into(), transform: Transform::IDENTITY, ref_width: None, ref_height: None }
    }

    #[must_use]
    pub fn with_panel(mut self, panel: Option<PanelSize>) -> Self {
        if let Some(panel) = panel {
            self.ref_width = Some(panel.width);
            self.ref_height = Some(panel.height);
        }
        self
    }

    /// Reference size recorded with the transform, if both sides are known.
    #[must_use]
    pub fn ref_size(&self) -> Option<PanelSize> {
        match (self.ref_width, self.ref_height) {
            (Some(width), Some(height)) => Some(PanelSize { width, height }),
            _ => None,
        }
    }
}

/// Wall → image mapping. Absent key means the panel is empty.
pub type WallImageState = BTreeMap<WallId, WallEntry>;

/// Timestamped wrapper exchanged between every adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncedRecord {
    pub images: WallImageState,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "updatedAt")]
    pub updated_at: i64,
}

impl SyncedRecord {
    #[must_use]
    pub fn new(images: WallImageState, updated_at: i64) -> Self {
        Self { images, updated_at }
    }

    /// Last-writer-wins rule: only a strictly newer timestamp replaces state.
    #[must_use]
    pub fn supersedes(&self, watermark: i64) -> bool {
        self.updated_at > watermark
    }

    /// Store-side acceptance: replace `self` with `incoming` if it is newer.
    /// Returns whether the replacement happened.
    pub fn replace_if_newer(&mut self, incoming: SyncedRecord) -> bool {
        if !incoming.supersedes(self.updated_at) {
            return false;
        }
        *self = incoming;
        true
    }
}
