//! Pure, stateless geometry for the canvas: selection bounds, handle
//! hit-testing, resize/rotate math and snapping.
//!
//! Angles are in degrees. Canvas space has y pointing down, so a positive
//! rotation is clockwise on screen.

mod hit_testing;
mod snapping;
mod transform;

use egui::{Pos2, Rect, Vec2, vec2};

pub use hit_testing::{
    HANDLE_RADIUS, Handle, HandleHit, ROTATION_HANDLE_OFFSET, available_handles, handle_position,
    hit_test_handles, layers_in_marquee, rotation_handle_position,
};
pub use snapping::{GuideSnap, snap_to_grid, snap_to_guides};
pub use transform::{
    SelectionBounds, axis_aligned_bounding_box, pointer_angle, resize_from_handle,
    rotate_around_center, scale_rect_between,
};

/// Smallest width/height any transform may produce
pub const MIN_LAYER_SIZE: f32 = 1.0;

/// Rotates `v` by `degrees` (clockwise on screen)
pub fn rotate_vec(v: Vec2, degrees: f32) -> Vec2 {
    if degrees == 0.0 {
        return v;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    vec2(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Maps any angle into (-180, 180]
pub fn normalize_degrees(degrees: f32) -> f32 {
    let mut d = degrees % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

/// The four corners of `rect` rotated around its center, clockwise from top-left
pub fn rotated_corners(rect: Rect, rotation: f32) -> [Pos2; 4] {
    let center = rect.center();
    [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
    ]
    .map(|corner| center + rotate_vec(corner - center, rotation))
}

/// Axis-aligned rect enclosing `rect` after rotation
pub fn rotated_bounds(rect: Rect, rotation: f32) -> Rect {
    if rotation == 0.0 {
        return rect;
    }
    let corners = rotated_corners(rect, rotation);
    Rect::from_points(&corners)
}
