//! Pointer and keyboard state machine for the canvas.
//!
//! The controller owns the selection and the gesture in progress. It mutates
//! the layer store directly on every pointer-move frame, and opens/commits one
//! history checkpoint per gesture so the whole gesture undoes as one step.

mod context;
mod shortcuts;
mod state;

use egui::{Key, Modifiers, Pos2, Rect, Vec2, vec2};
use log::debug;

use crate::config::ComposerConfig;
use crate::geometry::{
    self, GuideSnap, HandleHit, SelectionBounds, axis_aligned_bounding_box, handle_position,
    hit_test_handles, layers_in_marquee, resize_from_handle, rotate_around_center,
    scale_rect_between, snap_to_grid, snap_to_guides,
};
use crate::layer::{Layer, LayerId};
use crate::selection::Selection;
use crate::store::{LayerStore, ZOrderMove};

pub use context::EditContext;
pub use shortcuts::{ShortcutAction, action_for_key};
pub use state::{
    DragGesture, IDLE_TRANSITION_SECS, InteractionState, ResizeGesture, RotateGesture, ToolMode,
};

/// Pointer travel below which a shape-tool press counts as a click
const CLICK_SLOP: f32 = 2.0;

#[derive(Debug)]
pub struct InteractionController {
    tool: ToolMode,
    state: InteractionState,
    selection: Selection,
    /// Viewport offset: canvas point = viewport point - pan
    pan: Vec2,
    space_held: bool,
    guides: Option<GuideSnap>,
    config: ComposerConfig,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(ComposerConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            tool: ToolMode::Select,
            state: InteractionState::Idle,
            selection: Selection::new(),
            pan: Vec2::ZERO,
            space_held: false,
            guides: None,
            config,
        }
    }

    pub fn tool(&self) -> ToolMode {
        self.tool
    }

    /// Switching tools mid-gesture is ignored
    pub fn set_tool(&mut self, tool: ToolMode) {
        if self.state.is_interacting() {
            return;
        }
        if self.tool != tool {
            debug!("Tool changed: {:?} -> {:?}", self.tool, tool);
            self.tool = tool;
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_interacting(&self) -> bool {
        self.state.is_interacting()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.pan = pan;
    }

    pub fn space_held(&self) -> bool {
        self.space_held
    }

    /// While space is held any pointer-down pans, whatever the tool
    pub fn set_space_held(&mut self, held: bool) {
        self.space_held = held;
    }

    /// Guide lines the current drag snapped to, for rendering
    pub fn active_guides(&self) -> Option<&GuideSnap> {
        self.guides.as_ref()
    }

    pub fn to_canvas(&self, viewport_pos: Pos2) -> Pos2 {
        viewport_pos - self.pan
    }

    pub fn selection_bounds(&self, store: &LayerStore) -> Option<SelectionBounds> {
        axis_aligned_bounding_box(self.selection.ids().iter().filter_map(|id| store.get(*id)))
    }

    /// Selected layers that may be transformed, in stacking order
    fn movable_layers<'s>(&self, store: &'s LayerStore) -> Vec<&'s Layer> {
        self.selection
            .in_stack_order(store)
            .into_iter()
            .filter_map(|id| store.get(id))
            .filter(|layer| !layer.is_locked)
            .collect()
    }

    // ---- Selection -------------------------------------------------------

    /// Selects `id`; with `additive` its membership is toggled instead
    pub fn select(&mut self, store: &LayerStore, id: LayerId, additive: bool) {
        if !store.contains(id) {
            return;
        }
        if additive {
            self.selection.toggle(id);
        } else {
            self.selection.select_only(id);
        }
    }

    pub fn select_all(&mut self, store: &LayerStore) {
        self.selection.set(
            store
                .iter()
                .filter(|layer| layer.is_visible && !layer.is_locked)
                .map(|layer| layer.id),
        );
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Forgets selected ids that no longer exist
    pub fn prune_selection(&mut self, store: &LayerStore) {
        self.selection.retain_existing(store);
    }

    // ---- Pointer ---------------------------------------------------------

    pub fn pointer_down(&mut self, ctx: &mut EditContext<'_>, pos: Pos2, modifiers: Modifiers) {
        if self.state.is_interacting() {
            debug!("Pointer down ignored, {} in progress", self.state.name());
            return;
        }
        self.guides = None;

        if self.tool == ToolMode::Hand || self.space_held {
            self.state = InteractionState::Panning { last: pos };
            return;
        }

        let point = self.to_canvas(pos);
        let additive = modifiers.shift || modifiers.command;

        if self.tool == ToolMode::Select {
            if let Some(hit) = self.handle_under(&ctx.document.store, point) {
                match hit {
                    HandleHit::Resize(handle) => self.begin_resize(ctx, handle, point),
                    HandleHit::Rotate(_) => self.begin_rotate(ctx, point),
                }
                return;
            }
        }

        if let Some(id) = ctx.document.store.hit_test(point) {
            if additive {
                if !self.selection.toggle(id) {
                    // Deselected; nothing left under the pointer to drag
                    return;
                }
            } else if !self.selection.contains(id) {
                self.selection.select_only(id);
            }
            self.begin_drag(ctx, point);
            return;
        }

        if let Some(shape) = self.tool.shape_type() {
            let origin = self.snap_point(ctx, point);
            self.state = InteractionState::CreatingShape {
                shape,
                origin,
                current: origin,
            };
            return;
        }

        if !additive {
            self.selection.clear();
        }
        self.state = InteractionState::MarqueeSelecting {
            origin: point,
            current: point,
            base: self.selection.ids().to_vec(),
        };
    }

    pub fn pointer_move(&mut self, ctx: &mut EditContext<'_>, pos: Pos2, modifiers: Modifiers) {
        let point = self.to_canvas(pos);
        match self.state.clone() {
            InteractionState::Idle => {}
            InteractionState::Dragging(gesture) => self.drag_to(ctx, &gesture, point),
            InteractionState::Resizing(gesture) => {
                self.resize_with_pointer(ctx, &gesture, point, modifiers.shift)
            }
            InteractionState::Rotating(gesture) => {
                let snap = modifiers.shift.then_some(self.config.rotation_snap_degrees);
                let rotation = rotate_around_center(
                    gesture.rect,
                    gesture.start_rotation,
                    gesture.start_pointer,
                    point,
                    snap,
                );
                ctx.store().update_with(gesture.layer, |layer| {
                    let changed = layer.rotation != rotation;
                    layer.rotation = rotation;
                    changed
                });
            }
            InteractionState::MarqueeSelecting { origin, base, .. } => {
                let marquee = Rect::from_two_pos(origin, point);
                let hits = layers_in_marquee(ctx.document.store.layers(), marquee);
                self.selection.set(base.iter().copied().chain(hits));
                self.state = InteractionState::MarqueeSelecting {
                    origin,
                    current: point,
                    base,
                };
            }
            InteractionState::Panning { last } => {
                self.pan += pos - last;
                self.state = InteractionState::Panning { last: pos };
            }
            InteractionState::CreatingShape { shape, origin, .. } => {
                let current = self.snap_point(ctx, point);
                self.state = InteractionState::CreatingShape {
                    shape,
                    origin,
                    current,
                };
            }
        }
    }

    /// Applies the final pointer position and finalizes the gesture
    pub fn pointer_up(&mut self, ctx: &mut EditContext<'_>, pos: Pos2, modifiers: Modifiers) {
        if self.state.is_idle() {
            return;
        }
        self.pointer_move(ctx, pos, modifiers);
        self.commit(ctx);
    }

    /// Ends the active gesture, making its undo step durable
    pub fn commit(&mut self, ctx: &mut EditContext<'_>) {
        let state = std::mem::take(&mut self.state);
        self.guides = None;

        match state {
            InteractionState::Dragging(_)
            | InteractionState::Resizing(_)
            | InteractionState::Rotating(_) => {
                ctx.commit();
                debug!("Finished {}", state.name());
            }
            InteractionState::CreatingShape {
                shape,
                origin,
                current,
            } => {
                let mut rect = Rect::from_two_pos(origin, current);
                if rect.width() < CLICK_SLOP || rect.height() < CLICK_SLOP {
                    rect = Rect::from_min_size(origin, Vec2::splat(self.config.default_shape_size));
                }
                ctx.begin_interaction();
                let id = ctx.store().add(Layer::shape(shape, rect));
                ctx.commit();
                self.selection.select_only(id);
                self.tool = ToolMode::Select;
            }
            InteractionState::Idle
            | InteractionState::MarqueeSelecting { .. }
            | InteractionState::Panning { .. } => {}
        }
    }

    /// Abandons the active gesture. Transforms are rolled back to where they
    /// started; a marquee restores the previous selection.
    pub fn cancel_gesture(&mut self, ctx: &mut EditContext<'_>) -> bool {
        let state = std::mem::take(&mut self.state);
        self.guides = None;

        match state {
            InteractionState::Idle => false,
            InteractionState::Dragging(_)
            | InteractionState::Resizing(_)
            | InteractionState::Rotating(_) => {
                ctx.history.abort_interaction(ctx.document);
                true
            }
            InteractionState::MarqueeSelecting { base, .. } => {
                self.selection.set(base);
                true
            }
            InteractionState::Panning { .. } | InteractionState::CreatingShape { .. } => true,
        }
    }

    fn handle_under(&self, store: &LayerStore, point: Pos2) -> Option<HandleHit> {
        let bounds = self.selection_bounds(store)?;
        hit_test_handles(&bounds, point, self.selection.len(), self.config.handle_radius)
    }

    fn snap_point(&self, ctx: &EditContext<'_>, point: Pos2) -> Pos2 {
        let grid = &ctx.document.canvas().grid;
        if grid.snap {
            snap_to_grid(point, grid.size)
        } else {
            point
        }
    }

    fn begin_drag(&mut self, ctx: &mut EditContext<'_>, point: Pos2) {
        let moving = self.movable_layers(&ctx.document.store);
        let Some(start) = axis_aligned_bounding_box(moving.iter().copied()) else {
            return;
        };
        let originals = moving.iter().map(|layer| (layer.id, layer.position())).collect();
        // Union of unrotated rects, even for a single rotated layer
        let start_rect = moving
            .iter()
            .map(|layer| layer.rect())
            .fold(start.rect, |acc, rect| acc.union(rect));

        ctx.begin_interaction();
        self.state = InteractionState::Dragging(DragGesture {
            origin: point,
            originals,
            start_rect,
        });
    }

    fn begin_resize(&mut self, ctx: &mut EditContext<'_>, handle: geometry::Handle, point: Pos2) {
        let moving = self.movable_layers(&ctx.document.store);
        let Some(start) = axis_aligned_bounding_box(moving.iter().copied()) else {
            return;
        };
        let originals = moving.iter().map(|layer| (layer.id, layer.rect())).collect();

        ctx.begin_interaction();
        self.state = InteractionState::Resizing(ResizeGesture {
            handle,
            origin: point,
            start,
            originals,
        });
    }

    fn begin_rotate(&mut self, ctx: &mut EditContext<'_>, point: Pos2) {
        let Some(layer) = self
            .selection
            .single()
            .and_then(|id| ctx.document.store.get(id))
            .filter(|layer| !layer.is_locked)
        else {
            return;
        };
        let gesture = RotateGesture {
            layer: layer.id,
            rect: layer.rect(),
            start_pointer: point,
            start_rotation: layer.rotation,
        };

        ctx.begin_interaction();
        self.state = InteractionState::Rotating(gesture);
    }

    fn drag_to(&mut self, ctx: &mut EditContext<'_>, gesture: &DragGesture, point: Pos2) {
        let mut delta = point - gesture.origin;
        let canvas = ctx.document.canvas().clone();
        self.guides = None;

        if canvas.grid.snap {
            let target = snap_to_grid(gesture.start_rect.min + delta, canvas.grid.size);
            delta = target - gesture.start_rect.min;
        } else if canvas.guides.enabled {
            let moving: Vec<LayerId> = gesture.originals.iter().map(|(id, _)| *id).collect();
            let others: Vec<Rect> = ctx
                .document
                .store
                .iter()
                .filter(|layer| layer.is_visible && !moving.contains(&layer.id))
                .map(|layer| layer.visual_bounds())
                .chain(canvas.bounds())
                .collect();
            let proposed = gesture.start_rect.translate(delta);
            let snap = snap_to_guides(proposed, &others, self.config.guide_threshold);
            delta += snap.rect.min - proposed.min;
            self.guides = snap.is_snapped().then_some(snap);
        }

        let store = ctx.store();
        for (id, origin) in &gesture.originals {
            let target = *origin + delta;
            store.update_with(*id, |layer| {
                let changed = layer.position() != target;
                layer.set_position(target);
                changed
            });
        }
    }

    fn resize_with_pointer(
        &mut self,
        ctx: &mut EditContext<'_>,
        gesture: &ResizeGesture,
        point: Pos2,
        constrain_aspect: bool,
    ) {
        let mut delta = point - gesture.origin;
        let grid = ctx.document.canvas().grid.clone();
        if grid.snap && gesture.start.rotation == 0.0 {
            let start_handle = handle_position(&gesture.start, gesture.handle);
            delta = snap_to_grid(start_handle + delta, grid.size) - start_handle;
        }

        let rect = resize_from_handle(
            gesture.start.rect,
            gesture.handle,
            gesture.start.rotation,
            delta,
            constrain_aspect,
            self.config.min_layer_size,
        );
        self.apply_rects(ctx, gesture.start.rect, rect, &gesture.originals);
    }

    /// Places every layer of `originals` inside `to`, proportionally to where
    /// it sat inside `from`. A lone layer simply takes `to`.
    fn apply_rects(
        &self,
        ctx: &mut EditContext<'_>,
        from: Rect,
        to: Rect,
        originals: &[(LayerId, Rect)],
    ) {
        let min = self.config.min_layer_size;
        let store = ctx.store();
        for (id, original) in originals {
            let target = if originals.len() == 1 {
                to
            } else {
                let scaled = scale_rect_between(from, to, *original);
                Rect::from_min_size(scaled.min, vec2(scaled.width().max(min), scaled.height().max(min)))
            };
            store.update_with(*id, |layer| {
                let changed = layer.rect() != target;
                layer.set_rect(target);
                changed
            });
        }
    }

    // ---- One-step commands -------------------------------------------------

    /// Moves the selection by `delta` as a single undo step
    pub fn drag_by(&mut self, ctx: &mut EditContext<'_>, delta: Vec2) -> bool {
        if self.state.is_interacting() || delta == Vec2::ZERO {
            return false;
        }
        let ids: Vec<LayerId> = self
            .movable_layers(&ctx.document.store)
            .iter()
            .map(|layer| layer.id)
            .collect();
        if ids.is_empty() {
            return false;
        }

        ctx.begin_interaction();
        for id in ids {
            ctx.store().update_with(id, |layer| {
                layer.translate(delta);
                true
            });
        }
        ctx.commit();
        true
    }

    /// Fits the selection into `rect` as a single undo step
    pub fn resize_to(&mut self, ctx: &mut EditContext<'_>, rect: Rect) -> bool {
        if self.state.is_interacting() {
            return false;
        }
        let moving = self.movable_layers(&ctx.document.store);
        let Some(start) = axis_aligned_bounding_box(moving.iter().copied()) else {
            return false;
        };
        let originals: Vec<(LayerId, Rect)> =
            moving.iter().map(|layer| (layer.id, layer.rect())).collect();

        let min = self.config.min_layer_size;
        let target = Rect::from_min_size(rect.min, vec2(rect.width().max(min), rect.height().max(min)));

        ctx.begin_interaction();
        self.apply_rects(ctx, start.rect, target, &originals);
        ctx.commit();
        true
    }

    /// Sets the rotation of the single selected layer as one undo step
    pub fn rotate_to(&mut self, ctx: &mut EditContext<'_>, degrees: f32) -> bool {
        if self.state.is_interacting() {
            return false;
        }
        let Some(id) = self.selection.single() else {
            return false;
        };
        if ctx.document.store.get(id).is_none_or(|layer| layer.is_locked) {
            return false;
        }

        let rotation = geometry::normalize_degrees(degrees);
        ctx.begin_interaction();
        ctx.store().update_with(id, |layer| {
            let changed = layer.rotation != rotation;
            layer.rotation = rotation;
            changed
        });
        ctx.commit();
        true
    }

    pub fn delete_selection(&mut self, ctx: &mut EditContext<'_>) -> bool {
        let ids: Vec<LayerId> = self
            .movable_layers(&ctx.document.store)
            .iter()
            .map(|layer| layer.id)
            .collect();
        if ids.is_empty() {
            return false;
        }

        ctx.begin_interaction();
        for id in &ids {
            ctx.store().remove(*id);
        }
        ctx.commit();
        self.prune_selection(&ctx.document.store);
        debug!("Deleted {} layers", ids.len());
        true
    }

    /// Duplicates the selection and selects the copies
    pub fn duplicate_selection(&mut self, ctx: &mut EditContext<'_>) -> bool {
        let ids = self.selection.in_stack_order(&ctx.document.store);
        if ids.is_empty() {
            return false;
        }

        let offset = self.config.duplicate_offset;
        ctx.begin_interaction();
        let copies: Vec<LayerId> = ids
            .into_iter()
            .filter_map(|id| ctx.store().duplicate(id, offset))
            .collect();
        ctx.commit();
        self.selection.set(copies);
        true
    }

    pub fn reorder_selection(&mut self, ctx: &mut EditContext<'_>, movement: ZOrderMove) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let ids = self.selection.ids().to_vec();
        ctx.begin_interaction();
        let changed = ctx.store().move_layers(&ids, movement);
        ctx.commit();
        changed
    }

    pub fn undo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        if self.state.is_interacting() {
            return false;
        }
        let undone = ctx.history.undo(ctx.document);
        self.prune_selection(&ctx.document.store);
        undone
    }

    pub fn redo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        if self.state.is_interacting() {
            return false;
        }
        let redone = ctx.history.redo(ctx.document);
        self.prune_selection(&ctx.document.store);
        redone
    }

    // ---- Keyboard --------------------------------------------------------

    /// Runs the shortcut bound to `key`. Returns whether the key is bound.
    pub fn key_pressed(&mut self, ctx: &mut EditContext<'_>, key: Key, modifiers: Modifiers) -> bool {
        let Some(action) = action_for_key(key, modifiers) else {
            return false;
        };

        if self.state.is_interacting() {
            if action == ShortcutAction::Escape {
                self.cancel_gesture(ctx);
            }
            return true;
        }

        match action {
            ShortcutAction::SetTool(tool) => self.set_tool(tool),
            ShortcutAction::DeleteSelection => {
                self.delete_selection(ctx);
            }
            ShortcutAction::DuplicateSelection => {
                self.duplicate_selection(ctx);
            }
            ShortcutAction::ClearSelection | ShortcutAction::Escape => self.clear_selection(),
            ShortcutAction::SelectAll => self.select_all(&ctx.document.store),
            ShortcutAction::Undo => {
                self.undo(ctx);
            }
            ShortcutAction::Redo => {
                self.redo(ctx);
            }
            ShortcutAction::Reorder(movement) => {
                self.reorder_selection(ctx, movement);
            }
            ShortcutAction::Nudge { dx, dy, large } => {
                let step = if large {
                    self.config.nudge_step_large
                } else {
                    self.config.nudge_step
                };
                self.drag_by(ctx, vec2(f32::from(dx) * step, f32::from(dy) * step));
            }
        }
        true
    }
}
