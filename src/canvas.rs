use egui::{Rect, pos2, vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub visible: bool,
    pub snap: bool,
    pub size: f32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            visible: false,
            snap: false,
            size: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideSettings {
    pub enabled: bool,
}

/// Document-wide canvas configuration, edited from the sidebar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasSettings {
    pub width: f32,
    pub height: f32,
    /// CSS-style color, e.g. `#ffffff`
    pub background: String,
    /// When set, `width`, `height` and `background` are ignored
    pub is_infinite_canvas: bool,
    pub grid: GridSettings,
    pub guides: GuideSettings,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 1024.0,
            height: 1024.0,
            background: "#ffffff".to_owned(),
            is_infinite_canvas: false,
            grid: GridSettings::default(),
            guides: GuideSettings { enabled: true },
        }
    }
}

impl CanvasSettings {
    /// The artboard rect, or `None` on an infinite canvas
    pub fn bounds(&self) -> Option<Rect> {
        if self.is_infinite_canvas {
            None
        } else {
            Some(Rect::from_min_size(pos2(0.0, 0.0), vec2(self.width, self.height)))
        }
    }

    pub fn center(&self) -> egui::Pos2 {
        self.bounds().map_or(pos2(0.0, 0.0), |bounds| bounds.center())
    }
}
