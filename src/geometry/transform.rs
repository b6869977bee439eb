use egui::{Pos2, Rect, Vec2, vec2};

use super::{Handle, normalize_degrees, rotate_vec};
use crate::layer::Layer;

/// The frame drawn around a selection: a rect plus its rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionBounds {
    pub rect: Rect,
    pub rotation: f32,
}

/// Bounds of a selection.
///
/// A single layer reports its own rect and rotation. Several layers report the
/// tight union of their unrotated rects with `rotation = 0`, since there is no
/// shared orientation to speak of. `None` for an empty input.
pub fn axis_aligned_bounding_box<'a>(
    layers: impl IntoIterator<Item = &'a Layer>,
) -> Option<SelectionBounds> {
    let mut iter = layers.into_iter();
    let first = iter.next()?;

    let mut union = first.rect();
    let mut count = 1;
    for layer in iter {
        union = union.union(layer.rect());
        count += 1;
    }

    if count == 1 {
        Some(SelectionBounds {
            rect: first.rect(),
            rotation: first.rotation,
        })
    } else {
        Some(SelectionBounds {
            rect: union,
            rotation: 0.0,
        })
    }
}

/// Resizes `rect` by dragging `handle` by `pointer_delta` (canvas space).
///
/// The delta is projected into the rect's rotated frame, so the handle
/// opposite the dragged one stays put on screen. Corner handles scale both
/// axes, edge handles one. With `constrain_aspect` a corner drag keeps the
/// original aspect ratio, following whichever axis moved furthest.
/// The result is never smaller than `min_size` on either axis.
pub fn resize_from_handle(
    rect: Rect,
    handle: Handle,
    rotation: f32,
    pointer_delta: Vec2,
    constrain_aspect: bool,
    min_size: f32,
) -> Rect {
    let local = rotate_vec(pointer_delta, -rotation);
    let (sx, sy) = handle.signs();

    let old_w = rect.width();
    let old_h = rect.height();
    let mut w = old_w + sx * local.x;
    let mut h = old_h + sy * local.y;

    if constrain_aspect && handle.is_corner() && old_w > 0.0 && old_h > 0.0 {
        let fx = w / old_w;
        let fy = h / old_h;
        let factor = if (fx - 1.0).abs() >= (fy - 1.0).abs() { fx } else { fy };
        w = old_w * factor;
        h = old_h * factor;
    }

    let w = w.max(min_size);
    let h = h.max(min_size);

    // Keep the opposite anchor fixed in canvas space
    let center = rect.center();
    let anchor = center + rotate_vec(vec2(-sx * old_w / 2.0, -sy * old_h / 2.0), rotation);
    let new_center = anchor - rotate_vec(vec2(-sx * w / 2.0, -sy * h / 2.0), rotation);

    Rect::from_center_size(new_center, vec2(w, h))
}

/// Angle of `pointer` as seen from `center`, in degrees
pub fn pointer_angle(center: Pos2, pointer: Pos2) -> f32 {
    let d = pointer - center;
    d.y.atan2(d.x).to_degrees()
}

/// New rotation after the pointer travelled from `start_pointer` to `pointer`
/// around the center of `rect`. `snap_step` rounds the result (e.g. 15°).
pub fn rotate_around_center(
    rect: Rect,
    start_rotation: f32,
    start_pointer: Pos2,
    pointer: Pos2,
    snap_step: Option<f32>,
) -> f32 {
    let center = rect.center();
    let delta = pointer_angle(center, pointer) - pointer_angle(center, start_pointer);
    let mut rotation = start_rotation + delta;
    if let Some(step) = snap_step.filter(|step| *step > 0.0) {
        rotation = (rotation / step).round() * step;
    }
    normalize_degrees(rotation)
}

/// Maps `rect` from the frame `from` into the frame `to`, scaling position and
/// size proportionally. Used to resize every member of a multi-selection.
pub fn scale_rect_between(from: Rect, to: Rect, rect: Rect) -> Rect {
    let sx = if from.width() > 0.0 { to.width() / from.width() } else { 1.0 };
    let sy = if from.height() > 0.0 { to.height() / from.height() } else { 1.0 };

    let offset = rect.min - from.min;
    let min = to.min + vec2(offset.x * sx, offset.y * sy);
    Rect::from_min_size(min, vec2(rect.width() * sx, rect.height() * sy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn edge_handle_scales_one_axis() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 50.0));
        let out = resize_from_handle(rect, Handle::Right, 0.0, vec2(20.0, 30.0), false, 1.0);
        assert!(approx(out.width(), 120.0));
        assert!(approx(out.height(), 50.0));
        assert!(approx(out.min.x, 0.0));
    }

    #[test]
    fn top_left_moves_min_corner() {
        let rect = Rect::from_min_size(pos2(10.0, 10.0), vec2(100.0, 100.0));
        let out = resize_from_handle(rect, Handle::TopLeft, 0.0, vec2(10.0, -10.0), false, 1.0);
        assert!(approx(out.min.x, 20.0));
        assert!(approx(out.min.y, 0.0));
        assert!(approx(out.max.x, 110.0));
        assert!(approx(out.max.y, 110.0));
    }

    #[test]
    fn constrained_corner_keeps_aspect() {
        let rect = Rect::from_min_size(pos2(0.0, 0.0), vec2(200.0, 100.0));
        let out = resize_from_handle(rect, Handle::BottomRight, 0.0, vec2(100.0, 5.0), true, 1.0);
        assert!(approx(out.width(), 300.0));
        assert!(approx(out.height(), 150.0));
    }

    #[test]
    fn scale_rect_between_is_proportional() {
        let from = Rect::from_min_size(pos2(0.0, 0.0), vec2(100.0, 100.0));
        let to = Rect::from_min_size(pos2(0.0, 0.0), vec2(200.0, 50.0));
        let member = Rect::from_min_size(pos2(50.0, 50.0), vec2(50.0, 50.0));
        let out = scale_rect_between(from, to, member);
        assert_eq!(out, Rect::from_min_size(pos2(100.0, 25.0), vec2(100.0, 25.0)));
    }
}
