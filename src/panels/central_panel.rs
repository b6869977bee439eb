use crate::app::ComposerApp;
use crate::controller::{InteractionState, ToolMode};
use crate::geometry::{HandleHit, hit_test_handles};
use crate::input::CanvasEvent;

pub fn central_panel(app: &mut ComposerApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;
            app.canvas_rect = Some(canvas_rect);

            for event in app.input.process_input(ctx, canvas_rect, response.hovered()) {
                match event {
                    CanvasEvent::PointerDown { pos, modifiers } => app.composer.pointer_down(pos, modifiers),
                    CanvasEvent::PointerMove { pos, modifiers } => app.composer.pointer_move(pos, modifiers),
                    CanvasEvent::PointerUp { pos, modifiers } => app.composer.pointer_up(pos, modifiers),
                    CanvasEvent::Key { key, modifiers } => {
                        app.composer.key_pressed(key, modifiers);
                    }
                    CanvasEvent::SpaceHeld(held) => app.composer.set_space_held(held),
                }
            }

            if let Some(hover) = response.hover_pos() {
                let local = (hover - canvas_rect.min).to_pos2();
                ctx.set_cursor_icon(cursor_for(app, local));
            }

            app.renderer.render(ctx, &painter, canvas_rect, &app.composer);
        });
}

fn cursor_for(app: &ComposerApp, pos: egui::Pos2) -> egui::CursorIcon {
    let controller = app.composer.controller();
    match controller.state() {
        InteractionState::Panning { .. } => return egui::CursorIcon::Grabbing,
        InteractionState::Dragging(_) => return egui::CursorIcon::Move,
        InteractionState::Resizing(gesture) => return gesture.handle.cursor_icon(),
        InteractionState::Rotating(_) => return egui::CursorIcon::Alias,
        _ => {}
    }
    if controller.tool() == ToolMode::Hand || controller.space_held() {
        return egui::CursorIcon::Grab;
    }
    if controller.tool().shape_type().is_some() {
        return egui::CursorIcon::Crosshair;
    }

    let store = &app.composer.document().store;
    let point = controller.to_canvas(pos);
    let radius = app.composer.config().handle_radius;
    let hit = controller
        .selection_bounds(store)
        .and_then(|bounds| hit_test_handles(&bounds, point, controller.selection().len(), radius));
    match hit {
        Some(HandleHit::Resize(handle)) => handle.cursor_icon(),
        Some(HandleHit::Rotate(_)) => egui::CursorIcon::Alias,
        None if store.hit_test(point).is_some() => egui::CursorIcon::Move,
        None => egui::CursorIcon::Default,
    }
}
