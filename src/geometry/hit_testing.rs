use egui::{Pos2, Rect, vec2};

use super::{SelectionBounds, rotate_vec};
use crate::layer::{Layer, LayerId};

pub const HANDLE_RADIUS: f32 = 8.0;
/// Distance of a rotation handle beyond its corner, along the diagonal
pub const ROTATION_HANDLE_OFFSET: f32 = 18.0;

/// A resize handle on a selection frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub const ALL: [Handle; 8] = [
        Handle::TopLeft,
        Handle::Top,
        Handle::TopRight,
        Handle::Right,
        Handle::BottomRight,
        Handle::Bottom,
        Handle::BottomLeft,
        Handle::Left,
    ];

    pub const CORNERS: [Handle; 4] = [
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomRight,
        Handle::BottomLeft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::TopLeft => "tl",
            Handle::Top => "t",
            Handle::TopRight => "tr",
            Handle::Right => "r",
            Handle::BottomRight => "br",
            Handle::Bottom => "b",
            Handle::BottomLeft => "bl",
            Handle::Left => "l",
        }
    }

    pub fn is_corner(&self) -> bool {
        matches!(
            self,
            Handle::TopLeft | Handle::TopRight | Handle::BottomRight | Handle::BottomLeft
        )
    }

    /// Direction of the handle from the rect's center: -1, 0 or 1 per axis
    pub fn signs(&self) -> (f32, f32) {
        match self {
            Handle::TopLeft => (-1.0, -1.0),
            Handle::Top => (0.0, -1.0),
            Handle::TopRight => (1.0, -1.0),
            Handle::Right => (1.0, 0.0),
            Handle::BottomRight => (1.0, 1.0),
            Handle::Bottom => (0.0, 1.0),
            Handle::BottomLeft => (-1.0, 1.0),
            Handle::Left => (-1.0, 0.0),
        }
    }

    pub fn cursor_icon(&self) -> egui::CursorIcon {
        match self {
            Handle::TopLeft | Handle::BottomRight => egui::CursorIcon::ResizeNwSe,
            Handle::TopRight | Handle::BottomLeft => egui::CursorIcon::ResizeNeSw,
            Handle::Top | Handle::Bottom => egui::CursorIcon::ResizeVertical,
            Handle::Left | Handle::Right => egui::CursorIcon::ResizeHorizontal,
        }
    }
}

/// What a pointer-down landed on in the selection frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleHit {
    Resize(Handle),
    /// Rotation zones sit just outside the four corners
    Rotate(Handle),
}

/// Multi-selections only get corner handles: scaling one axis of several
/// layers at once has no single sensible meaning.
pub fn available_handles(selection_len: usize) -> &'static [Handle] {
    if selection_len > 1 {
        &Handle::CORNERS
    } else {
        &Handle::ALL
    }
}

pub fn handle_position(bounds: &SelectionBounds, handle: Handle) -> Pos2 {
    let (sx, sy) = handle.signs();
    let rect = bounds.rect;
    let local = vec2(sx * rect.width() / 2.0, sy * rect.height() / 2.0);
    rect.center() + rotate_vec(local, bounds.rotation)
}

pub fn rotation_handle_position(bounds: &SelectionBounds, corner: Handle) -> Pos2 {
    let (sx, sy) = corner.signs();
    let rect = bounds.rect;
    let local = vec2(
        sx * (rect.width() / 2.0 + ROTATION_HANDLE_OFFSET),
        sy * (rect.height() / 2.0 + ROTATION_HANDLE_OFFSET),
    );
    rect.center() + rotate_vec(local, bounds.rotation)
}

/// Resize handles win over rotation zones. Rotation is only offered for a
/// single selected layer.
pub fn hit_test_handles(
    bounds: &SelectionBounds,
    point: Pos2,
    selection_len: usize,
    radius: f32,
) -> Option<HandleHit> {
    if selection_len == 0 {
        return None;
    }

    for &handle in available_handles(selection_len) {
        if handle_position(bounds, handle).distance(point) <= radius {
            return Some(HandleHit::Resize(handle));
        }
    }

    if selection_len == 1 {
        for corner in Handle::CORNERS {
            if rotation_handle_position(bounds, corner).distance(point) <= radius {
                return Some(HandleHit::Rotate(corner));
            }
        }
    }

    None
}

/// Visible, unlocked layers whose on-screen footprint touches `marquee`,
/// bottom to top
pub fn layers_in_marquee(layers: &[Layer], marquee: Rect) -> Vec<LayerId> {
    layers
        .iter()
        .filter(|layer| layer.is_visible && !layer.is_locked)
        .filter(|layer| layer.visual_bounds().intersects(marquee))
        .map(|layer| layer.id)
        .collect()
}
