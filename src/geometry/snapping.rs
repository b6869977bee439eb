use egui::{Pos2, Rect, pos2, vec2};

/// Rounds `point` to the nearest grid intersection. A non-positive grid size
/// leaves the point untouched.
pub fn snap_to_grid(point: Pos2, grid_size: f32) -> Pos2 {
    if grid_size <= 0.0 {
        return point;
    }
    pos2(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    )
}

/// Result of aligning a rect against its neighbours
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideSnap {
    pub rect: Rect,
    /// x of the vertical guide line the rect snapped to
    pub vertical: Option<f32>,
    /// y of the horizontal guide line the rect snapped to
    pub horizontal: Option<f32>,
}

impl GuideSnap {
    pub fn is_snapped(&self) -> bool {
        self.vertical.is_some() || self.horizontal.is_some()
    }
}

fn closest_alignment(sources: [f32; 3], targets: impl Iterator<Item = [f32; 3]>, threshold: f32) -> Option<(f32, f32)> {
    let mut best: Option<(f32, f32)> = None;
    for target in targets {
        for line in target {
            for source in sources {
                let offset = line - source;
                if offset.abs() <= threshold
                    && best.is_none_or(|(current, _)| offset.abs() < current.abs())
                {
                    best = Some((offset, line));
                }
            }
        }
    }
    best
}

/// Nudges `rect` so that one of its left/center/right (and top/middle/bottom)
/// lines lands on the matching line of another rect, when within `threshold`.
/// Each axis snaps independently to its closest candidate.
pub fn snap_to_guides(rect: Rect, others: &[Rect], threshold: f32) -> GuideSnap {
    let xs = [rect.left(), rect.center().x, rect.right()];
    let ys = [rect.top(), rect.center().y, rect.bottom()];

    let snap_x = closest_alignment(
        xs,
        others.iter().map(|o| [o.left(), o.center().x, o.right()]),
        threshold,
    );
    let snap_y = closest_alignment(
        ys,
        others.iter().map(|o| [o.top(), o.center().y, o.bottom()]),
        threshold,
    );

    let dx = snap_x.map_or(0.0, |(offset, _)| offset);
    let dy = snap_y.map_or(0.0, |(offset, _)| offset);

    GuideSnap {
        rect: rect.translate(vec2(dx, dy)),
        vertical: snap_x.map(|(_, line)| line),
        horizontal: snap_y.map(|(_, line)| line),
    }
}
