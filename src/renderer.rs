use eframe::egui::{self, Color32, FontId, Id, Mesh, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2};

use crate::composer::Composer;
use crate::controller::InteractionState;
use crate::geometry::{
    self, available_handles, handle_position, rotated_corners, rotation_handle_position,
};
use crate::layer::{Layer, LayerContent, ShapeType};
use crate::texture_manager::TextureManager;

const SELECTION_COLOR: Color32 = Color32::from_rgb(0x3b, 0x82, 0xf6);
const GUIDE_COLOR: Color32 = Color32::from_rgb(0xec, 0x48, 0x99);
const ELLIPSE_SEGMENTS: usize = 48;

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`. Anything else falls back to `fallback`.
pub fn parse_color(value: &str, fallback: Color32) -> Color32 {
    let Some(hex) = value.trim().strip_prefix('#') else {
        return fallback;
    };
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let short = |i: usize| {
        let digit = u8::from_str_radix(hex.get(i..i + 1)?, 16).ok()?;
        Some(digit * 17)
    };
    let parsed = match hex.len() {
        3 => short(0).zip(short(1)).zip(short(2)).map(|((r, g), b)| Color32::from_rgb(r, g, b)),
        6 => channel(0)
            .zip(channel(2))
            .zip(channel(4))
            .map(|((r, g), b)| Color32::from_rgb(r, g, b)),
        8 => channel(0)
            .zip(channel(2))
            .zip(channel(4))
            .zip(channel(6))
            .map(|(((r, g), b), a)| Color32::from_rgba_unmultiplied(r, g, b, a)),
        _ => None,
    };
    parsed.unwrap_or(fallback)
}

/// Draws the composer's document and interaction chrome with egui's painter
pub struct Renderer {
    textures: TextureManager,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            textures: TextureManager::new(64),
        }
    }

    pub fn textures_mut(&mut self) -> &mut TextureManager {
        &mut self.textures
    }

    /// Renders the current frame into `rect`, the canvas area on screen
    pub fn render(&mut self, ctx: &egui::Context, painter: &Painter, rect: Rect, composer: &Composer) {
        self.textures.begin_frame();
        let origin = rect.min + composer.controller().pan();
        let to_screen = |p: Pos2| origin + p.to_vec2();
        let document = composer.document();
        let canvas = document.canvas();

        painter.rect_filled(rect, 0.0, Color32::from_gray(0xe5));
        if let Some(bounds) = canvas.bounds() {
            let fill = parse_color(&canvas.background, Color32::WHITE);
            painter.rect_filled(bounds.translate(origin.to_vec2()), 0.0, fill);
        }
        if canvas.grid.visible && canvas.grid.size > 1.0 {
            draw_grid(painter, rect, origin, canvas.grid.size);
        }

        let state = composer.state();
        let duration = state.transition_duration();
        for layer in document.store.iter().filter(|layer| layer.is_visible) {
            let animated = animate_layer(ctx, layer, duration);
            self.draw_layer(ctx, painter, &animated, origin.to_vec2());
        }

        if let Some(guides) = composer.controller().active_guides() {
            let stroke = Stroke::new(1.0, GUIDE_COLOR);
            if let Some(x) = guides.vertical {
                let x = origin.x + x;
                painter.vline(x, rect.y_range(), stroke);
            }
            if let Some(y) = guides.horizontal {
                let y = origin.y + y;
                painter.hline(rect.x_range(), y, stroke);
            }
        }

        let selection = composer.controller().selection();
        for layer in selection.ids().iter().filter_map(|id| document.store.get(*id)) {
            let outline: Vec<Pos2> = rotated_corners(layer.rect(), layer.rotation)
                .into_iter()
                .map(to_screen)
                .collect();
            painter.add(Shape::closed_line(outline, Stroke::new(1.0, SELECTION_COLOR)));
        }
        if let Some(bounds) = composer.controller().selection_bounds(&document.store) {
            if !state.is_interacting() || matches!(state, InteractionState::Resizing(_)) {
                for &handle in available_handles(selection.len()) {
                    let center = to_screen(handle_position(&bounds, handle));
                    let square = Rect::from_center_size(center, Vec2::splat(8.0));
                    painter.rect_filled(square, 1.0, Color32::WHITE);
                    painter.rect_stroke(square, 1.0, Stroke::new(1.0, SELECTION_COLOR));
                }
                if selection.len() == 1 {
                    for corner in geometry::Handle::CORNERS {
                        let center = to_screen(rotation_handle_position(&bounds, corner));
                        painter.circle_stroke(center, 3.0, Stroke::new(1.0, SELECTION_COLOR));
                    }
                }
            }
        }

        if let Some(marquee) = state.marquee_rect() {
            let marquee = marquee.translate(origin.to_vec2());
            painter.rect_filled(marquee, 0.0, SELECTION_COLOR.gamma_multiply(0.15));
            painter.rect_stroke(marquee, 0.0, Stroke::new(1.0, SELECTION_COLOR));
        }
        if let Some((shape, preview)) = state.shape_preview() {
            let preview = Layer::shape(shape, preview);
            self.draw_layer(ctx, painter, &preview, origin.to_vec2());
        }

        if state.is_interacting() {
            ctx.request_repaint();
        }
    }

    fn draw_layer(&mut self, ctx: &egui::Context, painter: &Painter, layer: &Layer, offset: Vec2) {
        let alpha = (layer.opacity / 100.0).clamp(0.0, 1.0);
        let rect = layer.rect().translate(offset);
        let corners = rotated_corners(rect, layer.rotation);

        match &layer.content {
            LayerContent::Image { url } => {
                let texture = url.as_deref().and_then(|url| self.textures.texture_for(ctx, url));
                match texture {
                    Some(texture) => {
                        let mut mesh = Mesh::with_texture(texture);
                        let tint = Color32::WHITE.gamma_multiply(alpha);
                        let uvs = [pos2(0.0, 0.0), pos2(1.0, 0.0), pos2(1.0, 1.0), pos2(0.0, 1.0)];
                        for (corner, uv) in corners.iter().zip(uvs) {
                            mesh.vertices.push(egui::epaint::Vertex {
                                pos: *corner,
                                uv,
                                color: tint,
                            });
                        }
                        mesh.add_triangle(0, 1, 2);
                        mesh.add_triangle(0, 2, 3);
                        painter.add(Shape::mesh(mesh));
                    }
                    None => {
                        painter.add(Shape::convex_polygon(
                            corners.to_vec(),
                            Color32::from_gray(0xbb).gamma_multiply(alpha),
                            Stroke::NONE,
                        ));
                        painter.text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            layer.name.as_str(),
                            FontId::proportional(12.0),
                            Color32::from_gray(0x55),
                        );
                    }
                }
            }
            LayerContent::Shape(style) => {
                let fill = parse_color(&style.fill_color, Color32::GRAY).gamma_multiply(alpha);
                match style.shape_type {
                    ShapeType::Rectangle if layer.rotation == 0.0 => {
                        painter.rect_filled(rect, style.border_radius, fill);
                    }
                    ShapeType::Rectangle => {
                        painter.add(Shape::convex_polygon(corners.to_vec(), fill, Stroke::NONE));
                    }
                    ShapeType::Ellipse => {
                        painter.add(Shape::convex_polygon(
                            ellipse_points(rect, layer.rotation),
                            fill,
                            Stroke::NONE,
                        ));
                    }
                }
            }
            LayerContent::Text(style) => {
                let color = parse_color(&style.color, Color32::BLACK).gamma_multiply(alpha);
                let galley = painter.layout(
                    style.display_text(),
                    FontId::proportional(style.font_size.max(1.0)),
                    color,
                    rect.width().max(1.0),
                );
                let text = egui::epaint::TextShape::new(corners[0], galley, color)
                    .with_angle(layer.rotation.to_radians());
                painter.add(text);
            }
        }
    }
}

/// Eases the layer's geometry toward its stored values; instant when
/// `duration` is zero
fn animate_layer(ctx: &egui::Context, layer: &Layer, duration: f32) -> Layer {
    let mut animated = layer.clone();
    let ease = |field: &str, value: f32| {
        ctx.animate_value_with_time(Id::new((layer.id, field)), value, duration)
    };
    animated.x = ease("x", layer.x);
    animated.y = ease("y", layer.y);
    animated.width = ease("width", layer.width);
    animated.height = ease("height", layer.height);
    animated
}

fn ellipse_points(rect: Rect, rotation: f32) -> Vec<Pos2> {
    let center = rect.center();
    let radii = rect.size() / 2.0;
    (0..ELLIPSE_SEGMENTS)
        .map(|i| {
            let t = i as f32 / ELLIPSE_SEGMENTS as f32 * std::f32::consts::TAU;
            let local = Vec2::new(radii.x * t.cos(), radii.y * t.sin());
            center + geometry::rotate_vec(local, rotation)
        })
        .collect()
}

fn draw_grid(painter: &Painter, rect: Rect, origin: Pos2, size: f32) {
    let stroke = Stroke::new(0.5, Color32::from_black_alpha(24));
    let mut x = origin.x + ((rect.left() - origin.x) / size).ceil() * size;
    while x < rect.right() {
        painter.vline(x, rect.y_range(), stroke);
        x += size;
    }
    let mut y = origin.y + ((rect.top() - origin.y) / size).ceil() * size;
    while y < rect.bottom() {
        painter.hline(rect.x_range(), y, stroke);
        y += size;
    }
}
