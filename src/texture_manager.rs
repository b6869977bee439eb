use std::collections::{HashMap, HashSet};

use base64::Engine as _;
use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use thiserror::Error;

/// Errors that can occur while turning an image reference into a texture
#[derive(Error, Debug)]
pub enum TextureLoadError {
    #[error("No image data for '{0}'")]
    Missing(String),
    #[error("Failed to read image: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Data uri is not base64 encoded")]
    UnsupportedDataUri,
    #[error("Invalid base64 in data uri: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Caches textures for image layers by uri, with least-recently-used eviction.
///
/// Raw bytes are registered up front (dropped files). `data:` uris are
/// decoded in place and on native, `file://` uris are read from disk on
/// first use. A uri that fails to load is
/// remembered and not retried until it is registered again.
pub struct TextureManager {
    texture_cache: HashMap<String, TextureHandle>,
    last_used: HashMap<String, u64>,
    sources: HashMap<String, Vec<u8>>,
    failed: HashSet<String>,
    current_frame: u64,
    max_cache_size: usize,
}

impl TextureManager {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            texture_cache: HashMap::new(),
            last_used: HashMap::new(),
            sources: HashMap::new(),
            failed: HashSet::new(),
            current_frame: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Should be called at the start of each frame
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Makes encoded image bytes available under `uri`
    pub fn register_bytes(&mut self, uri: impl Into<String>, bytes: Vec<u8>) {
        let uri = uri.into();
        self.failed.remove(&uri);
        self.texture_cache.remove(&uri);
        self.last_used.remove(&uri);
        self.sources.insert(uri, bytes);
    }

    /// The texture for `uri`, loading it on first use. `None` if it cannot be loaded.
    pub fn texture_for(&mut self, ctx: &Context, uri: &str) -> Option<TextureId> {
        if let Some(handle) = self.texture_cache.get(uri) {
            self.last_used.insert(uri.to_owned(), self.current_frame);
            return Some(handle.id());
        }
        if self.failed.contains(uri) {
            return None;
        }

        match self.decode(uri) {
            Ok(image) => {
                self.prune_cache_if_needed();
                let handle = ctx.load_texture(uri, image, TextureOptions::LINEAR);
                let id = handle.id();
                self.texture_cache.insert(uri.to_owned(), handle);
                self.last_used.insert(uri.to_owned(), self.current_frame);
                Some(id)
            }
            Err(err) => {
                log::warn!("Cannot display image {uri}: {err}");
                self.failed.insert(uri.to_owned());
                None
            }
        }
    }

    fn decode(&self, uri: &str) -> Result<ColorImage, TextureLoadError> {
        let image = match self.sources.get(uri) {
            Some(bytes) => image::load_from_memory(bytes)?,
            None if uri.starts_with("data:") => image::load_from_memory(&read_data_uri(uri)?)?,
            None => image::load_from_memory(&read_uri(uri)?)?,
        };
        let size = [image.width() as usize, image.height() as usize];
        let rgba = image.to_rgba8();
        Ok(ColorImage::from_rgba_unmultiplied(size, rgba.as_flat_samples().as_slice()))
    }

    fn prune_cache_if_needed(&mut self) {
        if self.texture_cache.len() < self.max_cache_size {
            return;
        }

        let mut entries: Vec<(String, u64)> = self
            .last_used
            .iter()
            .map(|(uri, frame)| (uri.clone(), *frame))
            .collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = self.texture_cache.len() + 1 - self.max_cache_size;
        for (uri, _) in entries.into_iter().take(to_remove) {
            self.texture_cache.remove(&uri);
            self.last_used.remove(&uri);
        }
    }

    pub fn cache_size(&self) -> usize {
        self.texture_cache.len()
    }
}

/// Bytes of a `data:[<mime>][;base64],<payload>` uri
fn read_data_uri(uri: &str) -> Result<Vec<u8>, TextureLoadError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| TextureLoadError::Missing(uri.to_owned()))?;
    if !header.ends_with(";base64") {
        return Err(TextureLoadError::UnsupportedDataUri);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

#[cfg(not(target_arch = "wasm32"))]
fn read_uri(uri: &str) -> Result<Vec<u8>, TextureLoadError> {
    match uri.strip_prefix("file://") {
        Some(path) => Ok(std::fs::read(path)?),
        None => Err(TextureLoadError::Missing(uri.to_owned())),
    }
}

#[cfg(target_arch = "wasm32")]
fn read_uri(uri: &str) -> Result<Vec<u8>, TextureLoadError> {
    Err(TextureLoadError::Missing(uri.to_owned()))
}
