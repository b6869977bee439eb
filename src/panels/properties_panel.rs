use crate::app::ComposerApp;
use crate::canvas::CanvasSettings;
use crate::generation::{GenerationMode, JobStatus, ResultTarget};
use crate::layer::LayerPatch;

pub fn properties_panel(app: &mut ComposerApp, ctx: &egui::Context) {
    egui::SidePanel::right("properties_panel")
        .resizable(true)
        .default_width(260.0)
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                document_section(app, ui);
                ui.separator();
                layer_section(app, ui);
                ui.separator();
                canvas_section(app, ui);
                ui.separator();
                generation_section(app, ui);
            });
        });
}

fn document_section(app: &mut ComposerApp, ui: &mut egui::Ui) {
    ui.heading("Document");
    ui.horizontal(|ui| {
        if ui.button("New").clicked() {
            app.composer.new_document(CanvasSettings::default());
        }
        if ui.button("Copy JSON").on_hover_text("Copy the document to the clipboard").clicked() {
            match app.composer.save_json(true) {
                Ok(json) => ui.ctx().copy_text(json),
                Err(err) => app.alert = Some(err.to_string()),
            }
        }
    });
    if app.composer.is_dirty() {
        ui.weak("Unsaved changes");
    }
    ui.weak("Drop images or a saved .json file onto the window to open them.");
}

/// Start and end of a sidebar edit spanning several frames, collected from
/// widget responses so the whole edit lands as one undo step
#[derive(Debug, Default)]
struct EditSpan {
    begin: bool,
    end: bool,
}

impl EditSpan {
    fn track(&mut self, response: egui::Response) -> egui::Response {
        self.begin |= response.gained_focus() || response.drag_started();
        self.end |= response.lost_focus() || response.drag_stopped();
        response
    }

    /// Runs `apply` inside the edit: opened before, committed after
    fn apply(self, app: &mut ComposerApp, apply: impl FnOnce(&mut ComposerApp)) {
        if self.begin {
            app.composer.begin_edit();
        }
        apply(app);
        if self.end {
            app.composer.end_edit();
        }
    }
}

fn layer_section(app: &mut ComposerApp, ui: &mut egui::Ui) {
    ui.heading("Layer");
    let Some(layer) = app
        .composer
        .controller()
        .selection()
        .single()
        .and_then(|id| app.composer.document().store.get(id))
        .cloned()
    else {
        ui.weak("Select a single layer to edit it.");
        return;
    };

    let mut name = layer.name.clone();
    let mut opacity = layer.opacity;
    let mut rotation = layer.rotation;
    let mut patch = LayerPatch::default();
    let mut span = EditSpan::default();

    egui::Grid::new("layer_properties").num_columns(2).show(ui, |ui| {
        ui.label("Name");
        if span.track(ui.text_edit_singleline(&mut name)).changed() {
            patch.name = Some(name);
        }
        ui.end_row();

        ui.label("Opacity");
        if span.track(ui.add(egui::Slider::new(&mut opacity, 0.0..=100.0))).changed() {
            patch.opacity = Some(opacity);
        }
        ui.end_row();

        ui.label("Rotation");
        let rotation_field = egui::DragValue::new(&mut rotation).range(-180.0..=180.0).suffix("°");
        if span.track(ui.add(rotation_field)).changed() {
            patch.rotation = Some(rotation);
        }
        ui.end_row();
    });

    span.apply(app, |app| {
        if patch != LayerPatch::default() {
            app.composer.update_layer(layer.id, &patch);
        }
    });
}

fn canvas_section(app: &mut ComposerApp, ui: &mut egui::Ui) {
    ui.heading("Canvas");
    let mut canvas = app.composer.document().canvas().clone();
    let mut span = EditSpan::default();

    ui.checkbox(&mut canvas.is_infinite_canvas, "Infinite canvas");
    ui.add_enabled_ui(!canvas.is_infinite_canvas, |ui| {
        egui::Grid::new("canvas_settings").num_columns(2).show(ui, |ui| {
            ui.label("Width");
            span.track(ui.add(egui::DragValue::new(&mut canvas.width).range(1.0..=8192.0)));
            ui.end_row();
            ui.label("Height");
            span.track(ui.add(egui::DragValue::new(&mut canvas.height).range(1.0..=8192.0)));
            ui.end_row();
            ui.label("Background");
            span.track(ui.text_edit_singleline(&mut canvas.background));
            ui.end_row();
        });
    });
    ui.horizontal(|ui| {
        ui.checkbox(&mut canvas.grid.visible, "Grid");
        ui.checkbox(&mut canvas.grid.snap, "Snap");
        span.track(ui.add(egui::DragValue::new(&mut canvas.grid.size).range(2.0..=200.0)));
    });
    ui.checkbox(&mut canvas.guides.enabled, "Smart guides");

    span.apply(app, |app| {
        if &canvas != app.composer.document().canvas() {
            app.composer.update_canvas(|current| *current = canvas);
        }
    });
}

fn generation_section(app: &mut ComposerApp, ui: &mut egui::Ui) {
    ui.heading("Generate");
    ui.add(
        egui::TextEdit::multiline(&mut app.form.prompt)
            .hint_text("Describe the result")
            .desired_rows(3),
    );
    ui.horizontal(|ui| {
        ui.radio_value(&mut app.form.mode, GenerationMode::MultiInput, "Combine");
        ui.radio_value(&mut app.form.mode, GenerationMode::Batch, "Each layer");
    });
    ui.horizontal(|ui| {
        ui.radio_value(&mut app.form.target, ResultTarget::NewLayer, "New layers");
        ui.radio_value(&mut app.form.target, ResultTarget::Gallery, "Gallery");
    });

    let can_generate =
        !app.composer.controller().selection().is_empty() && !app.form.prompt.trim().is_empty();
    ui.horizontal(|ui| {
        if ui.add_enabled(can_generate, egui::Button::new("Generate")).clicked() {
            let ctx = ui.ctx().clone();
            app.generate(&ctx);
        }
        if ui
            .add_enabled(app.composer.jobs().is_busy(), egui::Button::new("Cancel"))
            .clicked()
        {
            app.composer.cancel_generation();
        }
        if ui.button("Clear finished").clicked() {
            app.composer.clear_finished_jobs();
        }
    });

    for job in app.composer.jobs().jobs() {
        ui.horizontal(|ui| {
            ui.label(format!("#{}", job.id));
            let status = egui::RichText::new(job.status.label());
            match job.status {
                JobStatus::Error => ui.colored_label(egui::Color32::RED, status),
                JobStatus::Done => ui.colored_label(egui::Color32::GREEN, status),
                _ => ui.label(status),
            };
        });
        if let Some(error) = &job.error {
            ui.weak(error);
        }
    }

    let gallery = app.composer.gallery().list_all();
    if !gallery.is_empty() {
        ui.label(format!("Gallery: {} image(s)", gallery.len()));
    }
}
