use egui::{Pos2, Rect, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::geometry;

/// A unique identifier for a layer. Never reused within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl LayerId {
    /// Creates a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    Ellipse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

/// Typography of a text layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    #[serde(default)]
    pub font_style: FontStyle,
    pub color: String,
    #[serde(default)]
    pub text_align: TextAlign,
    pub line_height: f32,
    #[serde(default)]
    pub text_transform: TextTransform,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Inter".to_owned(),
            font_size: 48.0,
            font_weight: 400,
            font_style: FontStyle::Normal,
            color: "#000000".to_owned(),
            text_align: TextAlign::Left,
            line_height: 1.2,
            text_transform: TextTransform::None,
        }
    }
}

impl TextStyle {
    /// The text as it should be displayed, after `text_transform`
    pub fn display_text(&self) -> String {
        match self.text_transform {
            TextTransform::None => self.text.clone(),
            TextTransform::Uppercase => self.text.to_uppercase(),
            TextTransform::Lowercase => self.text.to_lowercase(),
            TextTransform::Capitalize => self
                .text
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeStyle {
    pub shape_type: ShapeType,
    pub fill_color: String,
    #[serde(default)]
    pub border_radius: f32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Rectangle,
            fill_color: "#d9d9d9".to_owned(),
            border_radius: 0.0,
        }
    }
}

/// Variant-specific payload of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerContent {
    Image {
        /// `None` when the referenced raster could not be resolved on load
        url: Option<String>,
    },
    Text(TextStyle),
    Shape(ShapeStyle),
}

impl LayerContent {
    pub fn kind(&self) -> &'static str {
        match self {
            LayerContent::Image { .. } => "image",
            LayerContent::Text(_) => "text",
            LayerContent::Shape(_) => "shape",
        }
    }

    fn same_kind(&self, other: &LayerContent) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

fn default_opacity() -> f32 {
    100.0
}

fn default_visible() -> bool {
    true
}

/// One positionable, transformable visual unit on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Rotation in degrees, clockwise, around the layer's center
    #[serde(default)]
    pub rotation: f32,
    /// 0–100
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(flatten)]
    pub content: LayerContent,
}

impl Layer {
    fn with_content(name: &str, rect: Rect, content: LayerContent) -> Self {
        Self {
            id: LayerId::new(),
            name: name.to_owned(),
            x: rect.min.x,
            y: rect.min.y,
            width: rect.width().max(0.0),
            height: rect.height().max(0.0),
            rotation: 0.0,
            opacity: 100.0,
            blend_mode: BlendMode::Normal,
            is_visible: true,
            is_locked: false,
            content,
        }
    }

    pub fn image(url: impl Into<String>, rect: Rect) -> Self {
        Self::with_content("Image", rect, LayerContent::Image { url: Some(url.into()) })
    }

    pub fn text(text: impl Into<String>, rect: Rect) -> Self {
        let style = TextStyle {
            text: text.into(),
            ..TextStyle::default()
        };
        Self::with_content("Text", rect, LayerContent::Text(style))
    }

    pub fn shape(shape_type: ShapeType, rect: Rect) -> Self {
        let name = match shape_type {
            ShapeType::Rectangle => "Rectangle",
            ShapeType::Ellipse => "Ellipse",
        };
        let style = ShapeStyle {
            shape_type,
            ..ShapeStyle::default()
        };
        Self::with_content(name, rect, LayerContent::Shape(style))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn kind(&self) -> &'static str {
        self.content.kind()
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.content {
            LayerContent::Image { url } => url.as_deref(),
            _ => None,
        }
    }

    /// Unrotated rect in canvas space
    pub fn rect(&self) -> Rect {
        Rect::from_min_size(pos2(self.x, self.y), vec2(self.width, self.height))
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.x = rect.min.x;
        self.y = rect.min.y;
        self.width = rect.width().max(0.0);
        self.height = rect.height().max(0.0);
    }

    pub fn position(&self) -> Pos2 {
        pos2(self.x, self.y)
    }

    pub fn set_position(&mut self, position: Pos2) {
        self.x = position.x;
        self.y = position.y;
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.x += delta.x;
        self.y += delta.y;
    }

    pub fn center(&self) -> Pos2 {
        self.rect().center()
    }

    /// Hit test in canvas space, honouring rotation
    pub fn contains_point(&self, point: Pos2) -> bool {
        let center = self.center();
        let local = center + geometry::rotate_vec(point - center, -self.rotation);
        self.rect().contains(local)
    }

    /// Axis-aligned rect enclosing the rotated layer
    pub fn visual_bounds(&self) -> Rect {
        geometry::rotated_bounds(self.rect(), self.rotation)
    }
}

/// A partial update to a layer. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub opacity: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    pub is_visible: Option<bool>,
    pub is_locked: Option<bool>,
    /// Replaces the variant payload; ignored when the variant differs
    pub content: Option<LayerContent>,
}

impl LayerPatch {
    pub fn rect(rect: Rect) -> Self {
        Self {
            x: Some(rect.min.x),
            y: Some(rect.min.y),
            width: Some(rect.width()),
            height: Some(rect.height()),
            ..Self::default()
        }
    }

    pub fn position(position: Pos2) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    pub fn rotation(rotation: f32) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    pub fn visibility(is_visible: bool) -> Self {
        Self {
            is_visible: Some(is_visible),
            ..Self::default()
        }
    }

    pub fn locked(is_locked: bool) -> Self {
        Self {
            is_locked: Some(is_locked),
            ..Self::default()
        }
    }

    pub fn content(content: LayerContent) -> Self {
        Self {
            content: Some(content),
            ..Self::default()
        }
    }

    /// Applies the patch, returning whether anything changed
    pub fn apply(&self, layer: &mut Layer) -> bool {
        let before = layer.clone();

        if let Some(name) = &self.name {
            layer.name = name.clone();
        }
        if let Some(x) = self.x {
            layer.x = x;
        }
        if let Some(y) = self.y {
            layer.y = y;
        }
        if let Some(width) = self.width {
            layer.width = width.max(0.0);
        }
        if let Some(height) = self.height {
            layer.height = height.max(0.0);
        }
        if let Some(rotation) = self.rotation {
            layer.rotation = geometry::normalize_degrees(rotation);
        }
        if let Some(opacity) = self.opacity {
            layer.opacity = opacity.clamp(0.0, 100.0);
        }
        if let Some(blend_mode) = self.blend_mode {
            layer.blend_mode = blend_mode;
        }
        if let Some(is_visible) = self.is_visible {
            layer.is_visible = is_visible;
        }
        if let Some(is_locked) = self.is_locked {
            layer.is_locked = is_locked;
        }
        if let Some(content) = &self.content {
            if layer.content.same_kind(content) {
                layer.content = content.clone();
            } else {
                log::warn!(
                    "Ignoring {} payload for {} layer {}",
                    content.kind(),
                    layer.kind(),
                    layer.id
                );
            }
        }

        *layer != before
    }
}
