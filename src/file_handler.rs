use std::io::Cursor;
use std::path::Path;

use egui::{Vec2, vec2};

use crate::error::DropError;

/// What a dropped file turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum DroppedContent {
    /// An image to place on the canvas. `bytes` is set when the data has to be
    /// registered with the renderer under `uri`.
    Image {
        uri: String,
        bytes: Option<Vec<u8>>,
        size: Vec2,
    },
    /// A saved document or preset
    Json { name: String, text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropKind {
    Image,
    Json,
}

/// Collects files dropped onto the window and turns them into canvas content
#[derive(Debug, Default)]
pub struct FileHandler {
    dropped_files: Vec<egui::DroppedFile>,
}

impl FileHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Picks up newly dropped files. Returns true if there is anything to process.
    pub fn check_for_dropped_files(&mut self, ctx: &egui::Context) -> bool {
        ctx.input(|i| {
            if !i.raw.dropped_files.is_empty() {
                self.dropped_files = i.raw.dropped_files.clone();
            }
        });
        !self.dropped_files.is_empty()
    }

    /// Reads and classifies every pending file. Failures are returned per file
    /// so one bad file does not block the rest.
    pub fn process_dropped_files(&mut self, max_image_size: f32) -> Vec<Result<DroppedContent, DropError>> {
        std::mem::take(&mut self.dropped_files)
            .iter()
            .map(|file| process_file(file, max_image_size))
            .collect()
    }

    /// Dims the window while files hover over it
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, Id, LayerId, Order};

        let names: Vec<String> = ctx.input(|i| {
            i.raw
                .hovered_files
                .iter()
                .map(|file| match &file.path {
                    Some(path) => path.display().to_string(),
                    None if !file.mime.is_empty() => file.mime.clone(),
                    None => "(unnamed file)".to_owned(),
                })
                .collect()
        });
        if names.is_empty() {
            return;
        }

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            format!("Drop to add:\n{}", names.join("\n")),
            egui::TextStyle::Heading.resolve(&ctx.style()),
            Color32::WHITE,
        );
    }
}

fn file_name(file: &egui::DroppedFile) -> String {
    if let Some(path) = &file.path {
        path.display().to_string()
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

fn classify(file: &egui::DroppedFile) -> Option<DropKind> {
    if file.mime.starts_with("image/") {
        return Some(DropKind::Image);
    }
    if file.mime == "application/json" {
        return Some(DropKind::Json);
    }

    let name = file_name(file);
    let ext = Path::new(&name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())?;
    match ext.as_str() {
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => Some(DropKind::Image),
        "json" => Some(DropKind::Json),
        _ => None,
    }
}

fn read_bytes(file: &egui::DroppedFile) -> Result<Vec<u8>, DropError> {
    if let Some(bytes) = &file.bytes {
        return Ok(bytes.to_vec());
    }

    #[cfg(not(target_arch = "wasm32"))]
    if let Some(path) = &file.path {
        return Ok(std::fs::read(path)?);
    }

    Err(DropError::NoData(file_name(file)))
}

fn process_file(file: &egui::DroppedFile, max_image_size: f32) -> Result<DroppedContent, DropError> {
    let name = file_name(file);
    let kind = classify(file).ok_or_else(|| DropError::Unsupported(name.clone()))?;
    let bytes = read_bytes(file)?;
    log::info!("Processing dropped file: {} ({} bytes)", name, bytes.len());

    match kind {
        DropKind::Image => {
            let size = image_dimensions(&name, &bytes)?;
            Ok(DroppedContent::Image {
                uri: format!("bytes://{name}"),
                bytes: Some(bytes),
                size: fit_within(size, max_image_size),
            })
        }
        DropKind::Json => {
            let text = String::from_utf8(bytes).map_err(|err| {
                DropError::Read(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
            })?;
            Ok(DroppedContent::Json { name, text })
        }
    }
}

/// Reads width and height from the image header without decoding pixels
pub fn image_dimensions(name: &str, bytes: &[u8]) -> Result<Vec2, DropError> {
    let decode_err = |source| DropError::Decode {
        name: name.to_owned(),
        source,
    };
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()
        .map_err(decode_err)?;
    Ok(vec2(width as f32, height as f32))
}

/// Scales `size` down, keeping its aspect ratio, so neither side exceeds `max`
pub fn fit_within(size: Vec2, max: f32) -> Vec2 {
    let largest = size.max_elem();
    if largest <= max || largest <= 0.0 {
        size
    } else {
        size * (max / largest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within_keeps_aspect_ratio() {
        assert_eq!(fit_within(vec2(1024.0, 512.0), 512.0), vec2(512.0, 256.0));
        assert_eq!(fit_within(vec2(100.0, 50.0), 512.0), vec2(100.0, 50.0));
    }

    #[test]
    fn classifies_by_extension() {
        let file = egui::DroppedFile {
            name: "scene.JSON".to_owned(),
            ..Default::default()
        };
        assert_eq!(classify(&file), Some(DropKind::Json));

        let file = egui::DroppedFile {
            name: "notes.txt".to_owned(),
            ..Default::default()
        };
        assert_eq!(classify(&file), None);
    }

    #[test]
    fn reads_png_dimensions() {
        let mut png = Vec::new();
        image::RgbaImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(image_dimensions("tiny.png", &png).unwrap(), vec2(3.0, 2.0));
    }
}
