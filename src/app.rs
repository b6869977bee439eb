use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::composer::Composer;
use crate::config::ComposerConfig;
use crate::file_handler::{DroppedContent, FileHandler};
use crate::gallery::MemoryGallery;
use crate::generation::{GenerationBackend, GenerationMode, GenerationOptions, GenerationRequest, ResultTarget};
use crate::input::InputHandler;
use crate::panels::{central_panel, properties_panel, tools_panel};
use crate::renderer::Renderer;

/// What survives a restart: the config and the last document
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
struct PersistedState {
    config: Option<ComposerConfig>,
    document: Option<String>,
}

/// Sidebar state for the generation form
#[derive(Debug, Clone, Default)]
pub struct GenerationForm {
    pub prompt: String,
    pub mode: GenerationMode,
    pub target: ResultTarget,
    pub options: GenerationOptions,
}

pub struct ComposerApp {
    pub(crate) composer: Composer,
    pub(crate) renderer: Renderer,
    pub(crate) input: InputHandler,
    pub(crate) files: FileHandler,
    pub(crate) form: GenerationForm,
    /// One message shown in a modal until dismissed
    pub(crate) alert: Option<String>,
    /// Screen rect of the canvas viewport as of the last frame
    pub(crate) canvas_rect: Option<egui::Rect>,
}

impl ComposerApp {
    /// Called once before the first frame. `config` overrides the persisted one.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        backend: Arc<dyn GenerationBackend>,
        config: Option<ComposerConfig>,
    ) -> Self {
        let persisted: PersistedState = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        let config = config.or(persisted.config).unwrap_or_default();

        let mut composer = Composer::new(config, backend, Arc::new(MemoryGallery::new()));
        if let Some(document) = persisted.document {
            if let Err(err) = composer.load_json(&document) {
                log::warn!("Discarding persisted document: {err}");
            }
        }

        Self {
            composer,
            renderer: Renderer::new(),
            input: InputHandler::new(),
            files: FileHandler::new(),
            form: GenerationForm::default(),
            alert: None,
            canvas_rect: None,
        }
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn generate(&mut self, ctx: &egui::Context) {
        let request = GenerationRequest {
            mode: self.form.mode,
            target: self.form.target,
            prompt: self.form.prompt.clone(),
            layers: Vec::new(),
            options: self.form.options.clone(),
        };
        if let Some(task) = self.composer.request_generation(request) {
            spawn_generation(ctx, task);
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        if !self.files.check_for_dropped_files(ctx) {
            return;
        }
        let max_size = self.composer.config().max_dropped_image_size;
        let pointer = ctx.input(|i| i.pointer.latest_pos());
        let local = pointer
            .zip(self.canvas_rect)
            .filter(|(pos, rect)| rect.contains(*pos))
            .map(|(pos, rect)| (pos - rect.min).to_pos2());
        let center = self.composer.drop_point(local);

        for dropped in self.files.process_dropped_files(max_size) {
            match dropped {
                Ok(DroppedContent::Image { uri, bytes, size }) => {
                    if let Some(bytes) = bytes {
                        self.renderer.textures_mut().register_bytes(uri.clone(), bytes);
                    }
                    self.composer.add_image_layer(uri, size, center);
                }
                Ok(DroppedContent::Json { name, text }) => {
                    if let Err(err) = self.composer.load_json(&text) {
                        self.alert = Some(format!("Could not open {name}: {err}"));
                    }
                }
                Err(err) => {
                    log::warn!("{err}");
                    self.alert = Some(err.to_string());
                }
            }
        }
    }

    fn show_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = &self.alert else {
            return;
        };
        let mut dismissed = false;
        egui::Window::new("Something went wrong")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        if dismissed {
            self.alert = None;
        }
    }
}

/// Runs a generation future off the UI thread and repaints when it is done.
/// Progress arrives through the composer's event channel in the meantime.
fn spawn_generation(ctx: &egui::Context, task: BoxFuture<'static, ()>) {
    let ctx = ctx.clone();
    let task = async move {
        task.await;
        ctx.request_repaint();
    };

    #[cfg(not(target_arch = "wasm32"))]
    std::thread::spawn(move || futures::executor::block_on(task));

    #[cfg(target_arch = "wasm32")]
    wasm_bindgen_futures::spawn_local(task);
}

impl eframe::App for ComposerApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let document = match self.composer.save_json(false) {
            Ok(json) => Some(json),
            Err(err) => {
                log::error!("Failed to persist document: {err}");
                None
            }
        };
        let state = PersistedState {
            config: Some(self.composer.config().clone()),
            document,
        };
        eframe::set_value(storage, eframe::APP_KEY, &state);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        tools_panel(self, ctx);
        properties_panel(self, ctx);
        central_panel(self, ctx);

        if self.composer.pump_job_events() > 0 {
            ctx.request_repaint();
        }
        if self.composer.jobs().is_busy() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }

        self.files.preview_files_being_dropped(ctx);
        self.show_alert(ctx);
    }
}
