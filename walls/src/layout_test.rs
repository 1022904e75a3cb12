#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-9;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// --- groups ---

#[test]
fn groups_cover_every_wall_once() {
    let mut ids: Vec<WallId> = PanelGroup::ALL.iter().flat_map(|g| g.walls().iter().map(|w| w.id)).collect();
    ids.sort();
    assert_eq!(ids, WallId::ALL.to_vec());
}

#[test]
fn group_of_matches_group_walls() {
    for group in PanelGroup::ALL {
        for rect in group.walls() {
            assert_eq!(PanelGroup::of(rect.id), group);
        }
    }
}

#[test]
fn group_parse_is_case_insensitive() {
    assert_eq!(PanelGroup::parse("W13"), Some(PanelGroup::W13));
    assert_eq!(PanelGroup::parse("w245"), Some(PanelGroup::W245));
    assert_eq!(PanelGroup::parse("w99"), None);
}

#[test]
fn walls_fit_inside_canvas() {
    for group in PanelGroup::ALL {
        let canvas = group.canvas();
        for rect in group.walls() {
            assert!(rect.x + rect.width <= canvas.width);
            assert!(rect.y + rect.height <= canvas.height);
        }
    }
}

// --- fit_canvas ---

#[test]
fn fit_canvas_is_width_bound_on_tall_viewport() {
    let size = fit_canvas(PanelSize::new(2880.0, 1620.0), PanelSize::new(1440.0, 2000.0));
    assert!(approx_eq(size.width, 1440.0));
    assert!(approx_eq(size.height, 810.0));
}

#[test]
fn fit_canvas_is_height_bound_on_wide_viewport() {
    let size = fit_canvas(PanelSize::new(3840.0, 2160.0), PanelSize::new(4000.0, 1080.0));
    assert!(approx_eq(size.width, 1920.0));
    assert!(approx_eq(size.height, 1080.0));
}

// --- place ---

#[test]
fn place_empty_wall_uses_identity() {
    let group = PanelGroup::W13;
    let rect = group.walls()[1];
    let p = place(None, &rect, group.canvas(), PanelSize::new(1440.0, 810.0), None);
    assert!(approx_eq(p.left, 0.0));
    assert!(approx_eq(p.top, 405.0));
    assert!(approx_eq(p.width, 1440.0));
    assert!(approx_eq(p.height, 405.0));
    assert_eq!((p.offset_x, p.offset_y, p.scale, p.rotation), (0.0, 0.0, 1.0, 0.0));
}

#[test]
fn place_rescales_translation_by_reference_size() {
    let group = PanelGroup::W13;
    let rect = group.walls()[0];
    let mut entry = WallEntry::new("a").with_panel(Some(PanelSize::new(720.0, 202.5)));
    entry.transform = Transform { x: 100.0, y: -50.0, scale: 2.0, rotation: 15.0 };

    let p = place(Some(&entry), &rect, group.canvas(), PanelSize::new(2880.0, 1620.0), None);
    assert!(approx_eq(p.offset_x, 400.0));
    assert!(approx_eq(p.offset_y, -200.0));
    assert!(approx_eq(p.scale, 2.0));
    assert!(approx_eq(p.rotation, 15.0));
}

#[test]
fn place_without_reference_size_keeps_translation() {
    let group = PanelGroup::W245;
    let rect = group.walls()[2];
    let mut entry = WallEntry::new("a");
    entry.transform.x = 30.0;
    let p = place(Some(&entry), &rect, group.canvas(), PanelSize::new(1920.0, 1080.0), None);
    assert!(approx_eq(p.offset_x, 30.0));
    assert!(approx_eq(p.left, 1152.0));
}

#[test]
fn place_applies_cover_base_scale() {
    let group = PanelGroup::W13;
    let rect = group.walls()[0];
    let entry = WallEntry::new("a");
    // Wall renders at 2880x810; a 1440x1440 image must scale by 2 to cover.
    let p = place(Some(&entry), &rect, group.canvas(), group.canvas(), Some(PanelSize::new(1440.0, 1440.0)));
    assert!(approx_eq(p.scale, 2.0));
}

// --- gestures ---

#[test]
fn drag_produces_absolute_translation() {
    let origin = Transform { x: 10.0, y: 20.0, scale: 1.0, rotation: 0.0 };
    let drag = DragGesture::begin(100.0, 100.0, &origin);
    assert_eq!(drag.update(130.0, 90.0), TransformPatch::translate(40.0, 10.0));
    assert_eq!(drag.update(100.0, 100.0), TransformPatch::translate(10.0, 20.0));
}

#[test]
fn wheel_zooms_and_clamps() {
    let t = Transform::IDENTITY;
    assert!(approx_eq(wheel_patch(&t, -100.0, false).scale.unwrap(), 1.1));
    assert_eq!(wheel_patch(&t, 5000.0, false).scale, Some(MIN_SCALE));
    assert_eq!(wheel_patch(&t, -50_000.0, false).scale, Some(MAX_SCALE));
}

#[test]
fn shift_wheel_rotates() {
    let t = Transform { rotation: 10.0, ..Transform::IDENTITY };
    let patch = wheel_patch(&t, 50.0, true);
    assert!(approx_eq(patch.rotation.unwrap(), 20.0));
    assert!(patch.scale.is_none());
}

// --- editor_panel ---

#[test]
fn editor_panel_falls_back_without_room() {
    let size = editor_panel(PanelGroup::W13, PanelSize::new(0.0, 0.0));
    assert!(approx_eq(size.width, 2880.0 * 0.3));
    assert!(approx_eq(size.height, 810.0 * 0.3));
}

#[test]
fn editor_panel_never_shrinks_below_floor() {
    let size = editor_panel(PanelGroup::W245, PanelSize::new(60.0, 40.0));
    assert!(approx_eq(size.width, 1152.0 * 0.1));
}

#[test]
fn editor_panel_w13_is_limited_by_width() {
    let size = editor_panel(PanelGroup::W13, PanelSize::new(1152.0, 860.0));
    assert!(approx_eq(size.width, 1152.0));
    assert!(approx_eq(size.height, 324.0));
}
