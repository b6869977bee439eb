use std::sync::Arc;

use egui::{Key, Modifiers, Pos2, Rect, Vec2};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::future::BoxFuture;
use log::{debug, error, info};

use crate::canvas::CanvasSettings;
use crate::config::ComposerConfig;
use crate::controller::{EditContext, InteractionController, InteractionState, ToolMode};
use crate::document::{Document, LoadedFile, parse_file};
use crate::error::{DocumentError, StoreError};
use crate::gallery::Gallery;
use crate::generation::{
    CancelToken, GenerationBackend, GenerationOrchestrator, GenerationRequest, JobBoard, JobEvent,
    LayerRasterizer, ProvenanceStamp, SourceImageRasterizer,
};
use crate::history::HistoryManager;
use crate::layer::{Layer, LayerId, LayerPatch};
use crate::store::ZOrderMove;

/// What a successfully loaded `.json` file did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Document,
    Preset,
}

/// The layer composer engine: the document, its history, the interaction
/// state machine and the generation jobs, behind one narrow interface.
///
/// All document mutation happens on the thread that owns the composer.
/// Generation futures returned by [`Composer::request_generation`] only talk
/// back through a channel drained by [`Composer::pump_job_events`].
pub struct Composer {
    document: Document,
    history: HistoryManager,
    controller: InteractionController,
    board: JobBoard,
    orchestrator: GenerationOrchestrator,
    rasterizer: Box<dyn LayerRasterizer>,
    gallery: Arc<dyn Gallery>,
    events_tx: UnboundedSender<JobEvent>,
    events_rx: UnboundedReceiver<JobEvent>,
    config: ComposerConfig,
}

impl Composer {
    pub fn new(
        config: ComposerConfig,
        backend: Arc<dyn GenerationBackend>,
        gallery: Arc<dyn Gallery>,
    ) -> Self {
        let config = config.validated();
        let (events_tx, events_rx) = mpsc::unbounded();
        Self {
            document: Document::default(),
            history: HistoryManager::new(config.history_depth),
            controller: InteractionController::new(config.clone()),
            board: JobBoard::new(),
            orchestrator: GenerationOrchestrator::new(backend, config.generation_workers),
            rasterizer: Box::new(SourceImageRasterizer),
            gallery,
            events_tx,
            events_rx,
            config,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: impl LayerRasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    pub fn with_stamp(mut self, stamp: Arc<dyn ProvenanceStamp>) -> Self {
        self.orchestrator = self.orchestrator.with_stamp(stamp);
        self
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.replace_document(document);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn jobs(&self) -> &JobBoard {
        &self.board
    }

    pub fn gallery(&self) -> &Arc<dyn Gallery> {
        &self.gallery
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn state(&self) -> &InteractionState {
        self.controller.state()
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty(&self.document)
    }

    fn parts(&mut self) -> (EditContext<'_>, &mut InteractionController) {
        (
            EditContext::new(&mut self.document, &mut self.history),
            &mut self.controller,
        )
    }

    // ---- Pointer & keyboard --------------------------------------------------

    pub fn pointer_down(&mut self, pos: Pos2, modifiers: Modifiers) {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.pointer_down(&mut ctx, pos, modifiers);
    }

    pub fn pointer_move(&mut self, pos: Pos2, modifiers: Modifiers) {
        let (mut ctx, controller) = self.parts();
        controller.pointer_move(&mut ctx, pos, modifiers);
    }

    pub fn pointer_up(&mut self, pos: Pos2, modifiers: Modifiers) {
        let (mut ctx, controller) = self.parts();
        controller.pointer_up(&mut ctx, pos, modifiers);
    }

    pub fn cancel_gesture(&mut self) -> bool {
        let (mut ctx, controller) = self.parts();
        controller.cancel_gesture(&mut ctx)
    }

    pub fn key_pressed(&mut self, key: Key, modifiers: Modifiers) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.key_pressed(&mut ctx, key, modifiers)
    }

    pub fn set_tool(&mut self, tool: ToolMode) {
        self.controller.set_tool(tool);
    }

    pub fn set_space_held(&mut self, held: bool) {
        self.controller.set_space_held(held);
    }

    pub fn set_pan(&mut self, pan: Vec2) {
        self.controller.set_pan(pan);
    }

    /// Where a file dropped at `viewport_pos` lands on the canvas. Without a
    /// pointer position it lands on the canvas center.
    pub fn drop_point(&self, viewport_pos: Option<Pos2>) -> Pos2 {
        viewport_pos
            .map(|pos| self.controller.to_canvas(pos))
            .unwrap_or_else(|| self.document.canvas().center())
    }

    // ---- Selection -------------------------------------------------------

    pub fn select(&mut self, id: LayerId, additive: bool) {
        self.controller.select(&self.document.store, id, additive);
    }

    pub fn select_all(&mut self) {
        self.controller.select_all(&self.document.store);
    }

    pub fn clear_selection(&mut self) {
        self.controller.clear_selection();
    }

    // ---- Edits -------------------------------------------------------------

    pub fn undo(&mut self) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.redo(&mut ctx)
    }

    pub fn drag_by(&mut self, delta: Vec2) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.drag_by(&mut ctx, delta)
    }

    pub fn resize_to(&mut self, rect: Rect) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.resize_to(&mut ctx, rect)
    }

    pub fn rotate_to(&mut self, degrees: f32) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.rotate_to(&mut ctx, degrees)
    }

    pub fn delete_selection(&mut self) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.delete_selection(&mut ctx)
    }

    pub fn duplicate_selection(&mut self) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.duplicate_selection(&mut ctx)
    }

    pub fn reorder_selection(&mut self, movement: ZOrderMove) -> bool {
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        controller.reorder_selection(&mut ctx, movement)
    }

    /// Adds a layer as one undo step and selects it
    pub fn add_layer(&mut self, layer: Layer) -> Option<LayerId> {
        if self.controller.is_interacting() {
            return None;
        }
        self.end_edit();
        let (mut ctx, controller) = self.parts();
        ctx.begin_interaction();
        let id = ctx.store().add(layer);
        ctx.commit();
        controller.select(&ctx.document.store, id, false);
        Some(id)
    }

    /// Adds an image layer of `size` centered on `center`
    pub fn add_image_layer(&mut self, uri: impl Into<String>, size: Vec2, center: Pos2) -> Option<LayerId> {
        let layer = Layer::image(uri, Rect::from_center_size(center, size));
        self.add_layer(layer)
    }

    /// Opens one undo step for a sidebar edit that spans several frames,
    /// such as typing a name or dragging a value. Patches applied until
    /// [`Composer::end_edit`] share the step.
    pub fn begin_edit(&mut self) -> bool {
        if self.controller.is_interacting() || self.history.is_interaction_open() {
            return false;
        }
        self.history.begin_interaction(&self.document);
        true
    }

    /// Whether a sidebar edit holds the open checkpoint
    pub fn is_editing(&self) -> bool {
        !self.controller.is_interacting() && self.history.is_interaction_open()
    }

    /// Commits the open sidebar edit, if any
    pub fn end_edit(&mut self) {
        if self.is_editing() {
            self.history.commit(&self.document);
        }
    }

    /// Sidebar edits of a single layer. Outside [`Composer::begin_edit`]
    /// each call is its own undo step.
    pub fn update_layer(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        if self.controller.is_interacting() {
            return false;
        }
        if self.is_editing() {
            return self.document.store.update(id, patch);
        }
        let (mut ctx, _) = self.parts();
        ctx.begin_interaction();
        let changed = ctx.store().update(id, patch);
        ctx.commit();
        changed
    }

    /// Applies a new stacking order from the layers panel
    pub fn reorder_layers(&mut self, order: &[LayerId]) -> Result<(), StoreError> {
        if self.controller.is_interacting() {
            return Ok(());
        }
        self.end_edit();
        let (mut ctx, _) = self.parts();
        ctx.begin_interaction();
        let result = ctx.store().reorder(order);
        ctx.commit();
        result
    }

    pub fn update_canvas(&mut self, f: impl FnOnce(&mut CanvasSettings)) -> bool {
        if self.controller.is_interacting() {
            return false;
        }
        if self.is_editing() {
            return self.document.update_canvas(f);
        }
        let (mut ctx, _) = self.parts();
        ctx.begin_interaction();
        let changed = ctx.document.update_canvas(f);
        ctx.commit();
        changed
    }

    // ---- Documents ---------------------------------------------------------

    /// Starts over with an empty document. History and pending jobs go with
    /// the old one.
    pub fn new_document(&mut self, canvas: CanvasSettings) {
        self.replace_document(Document::new(canvas));
        info!("Started a new document");
    }

    fn replace_document(&mut self, document: Document) {
        self.cancel_gesture();
        self.board.reset();
        self.document = document;
        self.history.reset(&self.document);
        self.controller.clear_selection();
    }

    /// Serializes the document. With `compact`, image urls already in the
    /// gallery are written as gallery references.
    pub fn save_json(&self, compact: bool) -> Result<String, DocumentError> {
        let gallery = compact.then_some(self.gallery.as_ref());
        self.document.to_json(gallery)
    }

    /// Loads a saved document or a preset. On failure the live document is
    /// left untouched.
    pub fn load_json(&mut self, json: &str) -> Result<LoadOutcome, DocumentError> {
        let loaded = parse_file(json, Some(self.gallery.as_ref())).inspect_err(|err| {
            error!("Failed to load file: {err}");
        })?;

        match loaded {
            LoadedFile::Document(document) => {
                self.replace_document(document);
                Ok(LoadOutcome::Document)
            }
            LoadedFile::Preset(canvas) => {
                self.cancel_gesture();
                self.end_edit();
                let (mut ctx, _) = self.parts();
                ctx.begin_interaction();
                ctx.document.set_canvas(canvas);
                ctx.commit();
                Ok(LoadOutcome::Preset)
            }
        }
    }

    // ---- Generation --------------------------------------------------------

    /// Starts generation for `request`. With no layers named, the current
    /// selection is used. Returns the future that runs the backend calls, for
    /// the host to spawn; `None` when nothing needs to run.
    pub fn request_generation(&mut self, mut request: GenerationRequest) -> Option<BoxFuture<'static, ()>> {
        if request.layers.is_empty() {
            request.layers = self.controller.selection().ids().to_vec();
        }
        let batch = self
            .orchestrator
            .prepare(&request, &self.document.store, self.rasterizer.as_ref());
        if batch.is_empty() {
            debug!("Generation request matched no layers");
            return None;
        }

        let cancel = CancelToken::new();
        self.board.track(batch.jobs, cancel.clone());
        if batch.work.is_empty() {
            return None;
        }
        Some(
            self.orchestrator
                .run(batch.work, request.options, cancel, self.events_tx.clone()),
        )
    }

    pub fn cancel_generation(&mut self) -> usize {
        self.board.cancel_all()
    }

    pub fn clear_finished_jobs(&mut self) {
        self.board.clear_finished();
    }

    /// Applies queued job events in arrival order. While a gesture or a
    /// sidebar edit is live nothing is applied; the events wait for the next
    /// call.
    pub fn pump_job_events(&mut self) -> usize {
        if self.controller.is_interacting() || self.is_editing() {
            return 0;
        }

        let mut applied = 0;
        while let Ok(Some(event)) = self.events_rx.try_next() {
            let mut ctx = EditContext::new(&mut self.document, &mut self.history);
            self.board
                .apply(event, &mut ctx, self.gallery.as_ref(), &self.config);
            applied += 1;
        }
        applied
    }
}
