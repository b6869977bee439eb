use egui::{Context, Key, Modifiers, PointerButton, Pos2, Rect};

/// Canvas-level input, with positions relative to the canvas area's top-left
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    PointerDown { pos: Pos2, modifiers: Modifiers },
    /// Only reported while a press that started on the canvas is held
    PointerMove { pos: Pos2, modifiers: Modifiers },
    PointerUp { pos: Pos2, modifiers: Modifiers },
    Key { key: Key, modifiers: Modifiers },
    SpaceHeld(bool),
}

/// Handles converting raw egui input into canvas events
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    /// Whether the primary button went down over the canvas and is still held
    pressed_on_canvas: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_on_canvas
    }

    /// Process raw egui input for this frame. Presses only count when they
    /// land on the canvas; once started, moves and the release are reported
    /// wherever the pointer goes. Keyboard input is skipped while a text field
    /// has focus.
    pub fn process_input(
        &mut self,
        ctx: &Context,
        canvas_rect: Rect,
        canvas_hovered: bool,
    ) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        let keyboard_taken = ctx.wants_keyboard_input();
        let to_local = |pos: Pos2| (pos - canvas_rect.min).to_pos2();

        ctx.input(|input| {
            let modifiers = input.modifiers;
            let hover = input.pointer.hover_pos();

            if input.pointer.button_pressed(PointerButton::Primary) {
                if let Some(pos) = hover.filter(|pos| canvas_hovered && canvas_rect.contains(*pos)) {
                    self.pressed_on_canvas = true;
                    self.last_pointer_pos = Some(pos);
                    events.push(CanvasEvent::PointerDown {
                        pos: to_local(pos),
                        modifiers,
                    });
                }
            }

            if self.pressed_on_canvas {
                if let Some(pos) = hover.filter(|pos| Some(*pos) != self.last_pointer_pos) {
                    self.last_pointer_pos = Some(pos);
                    events.push(CanvasEvent::PointerMove {
                        pos: to_local(pos),
                        modifiers,
                    });
                }

                if input.pointer.button_released(PointerButton::Primary)
                    || !input.pointer.button_down(PointerButton::Primary)
                {
                    let pos = hover.or(self.last_pointer_pos).unwrap_or(canvas_rect.min);
                    self.pressed_on_canvas = false;
                    events.push(CanvasEvent::PointerUp {
                        pos: to_local(pos),
                        modifiers,
                    });
                }
            }

            if keyboard_taken {
                return;
            }
            for event in &input.events {
                let egui::Event::Key {
                    key,
                    pressed,
                    repeat,
                    modifiers,
                    ..
                } = event
                else {
                    continue;
                };
                if *key == Key::Space {
                    if !repeat {
                        events.push(CanvasEvent::SpaceHeld(*pressed));
                    }
                } else if *pressed {
                    events.push(CanvasEvent::Key {
                        key: *key,
                        modifiers: *modifiers,
                    });
                }
            }
        });

        events
    }
}
