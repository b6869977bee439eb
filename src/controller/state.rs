use egui::{Pos2, Rect};

use crate::geometry::{Handle, SelectionBounds};
use crate::layer::{LayerId, ShapeType};

/// Transition length the renderer uses while no gesture is active
pub const IDLE_TRANSITION_SECS: f32 = 0.15;

/// The active canvas tool. Gates which gestures a pointer-down may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum ToolMode {
    #[default]
    Select,
    Hand,
    Rectangle,
    Ellipse,
}

impl ToolMode {
    pub const ALL: [ToolMode; 4] = [
        ToolMode::Select,
        ToolMode::Hand,
        ToolMode::Rectangle,
        ToolMode::Ellipse,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ToolMode::Select => "Select (V)",
            ToolMode::Hand => "Hand (H)",
            ToolMode::Rectangle => "Rectangle (R)",
            ToolMode::Ellipse => "Ellipse (O)",
        }
    }

    pub fn shape_type(&self) -> Option<ShapeType> {
        match self {
            ToolMode::Rectangle => Some(ShapeType::Rectangle),
            ToolMode::Ellipse => Some(ShapeType::Ellipse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragGesture {
    pub origin: Pos2,
    /// Each moving layer with its position at pointer-down
    pub originals: Vec<(LayerId, Pos2)>,
    /// Union of the moving layers at pointer-down
    pub start_rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeGesture {
    pub handle: Handle,
    pub origin: Pos2,
    pub start: SelectionBounds,
    pub originals: Vec<(LayerId, Rect)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotateGesture {
    pub layer: LayerId,
    pub rect: Rect,
    pub start_pointer: Pos2,
    pub start_rotation: f32,
}

/// Where the interaction state machine currently is.
///
/// ```text
///          ┌──► Dragging ───────┐
///          ├──► Resizing ───────┤
///  Idle ───┼──► Rotating ───────┼──► Idle
///          ├──► MarqueeSelecting┤
///          ├──► Panning ────────┤
///          └──► CreatingShape ──┘
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging(DragGesture),
    Resizing(ResizeGesture),
    Rotating(RotateGesture),
    MarqueeSelecting {
        origin: Pos2,
        current: Pos2,
        /// Selection at pointer-down; marquee hits are added on top
        base: Vec<LayerId>,
    },
    /// Positions in viewport space
    Panning { last: Pos2 },
    CreatingShape {
        shape: ShapeType,
        origin: Pos2,
        current: Pos2,
    },
}

impl InteractionState {
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    /// True for the whole span of a gesture; blocks new gestures from starting
    pub fn is_interacting(&self) -> bool {
        !self.is_idle()
    }

    /// Whether the gesture holds an open history checkpoint
    pub fn is_transforming(&self) -> bool {
        matches!(
            self,
            InteractionState::Dragging(_) | InteractionState::Resizing(_) | InteractionState::Rotating(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Dragging(_) => "dragging",
            InteractionState::Resizing(_) => "resizing",
            InteractionState::Rotating(_) => "rotating",
            InteractionState::MarqueeSelecting { .. } => "marquee-selecting",
            InteractionState::Panning { .. } => "panning",
            InteractionState::CreatingShape { .. } => "creating-shape",
        }
    }

    /// Layer transitions are instant mid-gesture so the layer tracks the pointer
    pub fn transition_duration(&self) -> f32 {
        if self.is_interacting() { 0.0 } else { IDLE_TRANSITION_SECS }
    }

    pub fn marquee_rect(&self) -> Option<Rect> {
        match self {
            InteractionState::MarqueeSelecting { origin, current, .. } => {
                Some(Rect::from_two_pos(*origin, *current))
            }
            _ => None,
        }
    }

    pub fn shape_preview(&self) -> Option<(ShapeType, Rect)> {
        match self {
            InteractionState::CreatingShape { shape, origin, current } => {
                Some((*shape, Rect::from_two_pos(*origin, *current)))
            }
            _ => None,
        }
    }
}
