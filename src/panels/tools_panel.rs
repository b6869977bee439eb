use crate::app::ComposerApp;
use crate::controller::ToolMode;
use crate::layer::{LayerId, LayerPatch};
use crate::store::ZOrderMove;

pub fn tools_panel(app: &mut ComposerApp, ctx: &egui::Context) {
    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Tools");

            let active = app.composer.controller().tool();
            ui.horizontal_wrapped(|ui| {
                for tool in ToolMode::ALL {
                    if ui.selectable_label(active == tool, tool.label()).clicked() {
                        log::info!("Tool selected from UI: {:?}", tool);
                        app.composer.set_tool(tool);
                    }
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                let can_undo = app.composer.history().can_undo();
                let can_redo = app.composer.history().can_redo();

                if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
                    app.composer.undo();
                }
                if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
                    app.composer.redo();
                }
            });
            let history = app.composer.history();
            ui.label(format!(
                "Undo stack: {}  Redo stack: {}",
                history.undo_len(),
                history.redo_len()
            ));
            ui.separator();

            layers_section(app, ui);
        });
}

fn layers_section(app: &mut ComposerApp, ui: &mut egui::Ui) {
    ui.heading("Layers");

    let has_selection = !app.composer.controller().selection().is_empty();
    ui.add_enabled_ui(has_selection, |ui| {
        ui.horizontal_wrapped(|ui| {
            for (label, movement) in [
                ("Front", ZOrderMove::ToFront),
                ("Forward", ZOrderMove::Forward),
                ("Backward", ZOrderMove::Backward),
                ("Back", ZOrderMove::ToBack),
            ] {
                if ui.small_button(label).clicked() {
                    app.composer.reorder_selection(movement);
                }
            }
            if ui.small_button("Duplicate").clicked() {
                app.composer.duplicate_selection();
            }
            if ui.small_button("Delete").clicked() {
                app.composer.delete_selection();
            }
        });
    });
    ui.separator();

    // Collect rows first so the composer can be mutated from the buttons
    let rows: Vec<(LayerId, String, bool, bool, bool)> = app
        .composer
        .document()
        .store
        .iter()
        .rev()
        .map(|layer| {
            let selected = app.composer.controller().selection().contains(layer.id);
            let label = if layer.name.is_empty() {
                layer.kind().to_owned()
            } else {
                layer.name.clone()
            };
            (layer.id, label, selected, layer.is_visible, layer.is_locked)
        })
        .collect();

    egui::ScrollArea::vertical().show(ui, |ui| {
        for (id, label, selected, mut visible, mut locked) in rows {
            ui.horizontal(|ui| {
                if ui.checkbox(&mut visible, "").on_hover_text("Visible").changed() {
                    app.composer.update_layer(id, &LayerPatch::visibility(visible));
                }
                if ui.checkbox(&mut locked, "").on_hover_text("Locked").changed() {
                    app.composer.update_layer(id, &LayerPatch::locked(locked));
                }
                if ui.selectable_label(selected, label).clicked() {
                    let additive = ui.input(|i| i.modifiers.shift || i.modifiers.command);
                    app.composer.select(id, additive);
                }
            });
        }
    });
}
