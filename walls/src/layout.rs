//! Panel geometry and gesture math for presentation consumers.
//!
//! Nothing here touches sync state. Render views call [`place`] to turn a
//! wall entry into concrete pixel placement, and editors feed pointer input
//! through [`DragGesture`] / [`wheel_patch`] to produce transform patches.

use serde::Serialize;

use crate::model::{PanelSize, Transform, TransformPatch, WallEntry, WallId};

#[cfg(test)]
#[path = "layout_test.rs"]
mod tests;

/// Wheel delta → scale factor.
pub const WHEEL_SCALE_STEP: f64 = -0.001;
/// Wheel delta → degrees, when shift is held.
pub const WHEEL_ROTATE_STEP: f64 = 0.2;
pub const MIN_SCALE: f64 = 0.2;
pub const MAX_SCALE: f64 = 5.0;

// =============================================================================
// GEOMETRY
// =============================================================================

/// A wall's footprint on its group canvas, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WallRect {
    pub id: WallId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Walls rendered together on one full-screen canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelGroup {
    /// Two stacked landscape walls.
    W13,
    /// Three portrait walls side by side.
    W245,
}

const W13_WALLS: [WallRect; 2] = [
    WallRect { id: WallId::W1, x: 0.0, y: 0.0, width: 2880.0, height: 810.0 },
    WallRect { id: WallId::W3, x: 0.0, y: 810.0, width: 2880.0, height: 810.0 },
];

const W245_WALLS: [WallRect; 3] = [
    WallRect { id: WallId::W2, x: 0.0, y: 0.0, width: 1152.0, height: 1944.0 },
    WallRect { id: WallId::W4, x: 1152.0, y: 0.0, width: 1152.0, height: 1944.0 },
    WallRect { id: WallId::W5, x: 2304.0, y: 0.0, width: 1152.0, height: 1944.0 },
];

impl PanelGroup {
    pub const ALL: [PanelGroup; 2] = [PanelGroup::W13, PanelGroup::W245];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::W13 => "w13",
            Self::W245 => "w245",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    #[must_use]
    pub fn canvas(self) -> PanelSize {
        match self {
            Self::W13 => PanelSize::new(2880.0, 1620.0),
            Self::W245 => PanelSize::new(3840.0, 2160.0),
        }
    }

    #[must_use]
    pub fn walls(self) -> &'static [WallRect] {
        match self {
            Self::W13 => &W13_WALLS,
            Self::W245 => &W245_WALLS,
        }
    }

    /// Group that renders `wall`.
    #[must_use]
    pub fn of(wall: WallId) -> Self {
        match wall {
            WallId::W1 | WallId::W3 => Self::W13,
            WallId::W2 | WallId::W4 | WallId::W5 => Self::W245,
        }
    }
}

/// Largest size with the canvas aspect ratio that fits in `viewport`.
#[must_use]
pub fn fit_canvas(canvas: PanelSize, viewport: PanelSize) -> PanelSize {
    let ratio = canvas.width / canvas.height;
    let width = viewport.width.min(viewport.height * ratio);
    PanelSize::new(width, width / ratio)
}

// =============================================================================
// PLACEMENT
// =============================================================================

/// Where and how to draw one wall's image inside a rendered canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub wall: WallId,
    /// Wall rectangle in container pixels.
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Image centre offset from the wall centre, in container pixels.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Cover scale times the user scale.
    pub scale: f64,
    pub rotation: f64,
}

/// Compute placement of `entry` on `rect` for a canvas drawn at `container`.
///
/// Translation was authored against the panel size recorded in the entry,
/// so it is rescaled to the wall's current pixel size. `natural` is the
/// decoded image size; unknown sizes render at base scale 1.
#[must_use]
pub fn place(
    entry: Option<&WallEntry>,
    rect: &WallRect,
    canvas: PanelSize,
    container: PanelSize,
    natural: Option<PanelSize>,
) -> Placement {
    let width = rect.width / canvas.width * container.width;
    let height = rect.height / canvas.height * container.height;
    let transform = entry.map_or(Transform::IDENTITY, |e| e.transform);

    let ref_width = entry.and_then(|e| e.ref_width).filter(|w| *w > 0.0).unwrap_or(width);
    let ref_height = entry.and_then(|e| e.ref_height).filter(|h| *h > 0.0).unwrap_or(height);

    let base_scale = match natural {
        Some(n) if n.width > 0.0 && n.height > 0.0 => (width / n.width).max(height / n.height),
        _ => 1.0,
    };

    Placement {
        wall: rect.id,
        left: rect.x / canvas.width * container.width,
        top: rect.y / canvas.height * container.height,
        width,
        height,
        offset_x: transform.x * (width / ref_width),
        offset_y: transform.y * (height / ref_height),
        scale: base_scale * transform.scale,
        rotation: transform.rotation,
    }
}

// =============================================================================
// GESTURES
// =============================================================================

/// Pointer drag that moves an image. Captures the transform origin on press
/// so every move produces an absolute patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragGesture {
    start_x: f64,
    start_y: f64,
    origin_x: f64,
    origin_y: f64,
}

impl DragGesture {
    #[must_use]
    pub fn begin(pointer_x: f64, pointer_y: f64, transform: &Transform) -> Self {
        Self { start_x: pointer_x, start_y: pointer_y, origin_x: transform.x, origin_y: transform.y }
    }

    #[must_use]
    pub fn update(&self, pointer_x: f64, pointer_y: f64) -> TransformPatch {
        TransformPatch::translate(
            self.origin_x + (pointer_x - self.start_x),
            self.origin_y + (pointer_y - self.start_y),
        )
    }
}

/// Wheel input: zoom by default, rotate when shift is held.
#[must_use]
pub fn wheel_patch(transform: &Transform, delta_y: f64, shift: bool) -> TransformPatch {
    if shift {
        TransformPatch::rotation(transform.rotation + delta_y * WHEEL_ROTATE_STEP)
    } else {
        TransformPatch::scale((transform.scale + delta_y * WHEEL_SCALE_STEP).clamp(MIN_SCALE, MAX_SCALE))
    }
}

/// Editor panel size for a wall when the group is drawn into `available`,
/// reserving room for labels and gaps between panels.
#[must_use]
pub fn editor_panel(group: PanelGroup, available: PanelSize) -> PanelSize {
    const GAP_PX: f64 = 24.0;
    const LABEL_PX: f64 = 32.0;
    const FALLBACK_SCALE: f64 = 0.3;
    const MIN_EDITOR_SCALE: f64 = 0.1;

    let wall = group.walls()[0];
    let has_room = available.width > 0.0 && available.height > 0.0;
    let scale = match group {
        PanelGroup::W13 if has_room => {
            let effective_height = available.height - GAP_PX - LABEL_PX * 2.0;
            (available.width / wall.width).min(effective_height / (wall.height * 2.0))
        }
        PanelGroup::W245 if has_room => {
            let effective_width = available.width - GAP_PX * 2.0;
            let effective_height = available.height - LABEL_PX;
            (effective_width / (wall.width * 3.0)).min(effective_height / wall.height)
        }
        _ => FALLBACK_SCALE,
    }
    .max(MIN_EDITOR_SCALE);

    PanelSize::new(wall.width * scale, wall.height * scale)
}
