use log::{info, warn};
use serde_json::{Value, json};

use crate::canvas::CanvasSettings;
use crate::error::DocumentError;
use crate::gallery::Gallery;
use crate::layer::Layer;
use crate::store::LayerStore;

/// View id stamped into every saved document; imports with another id are rejected
pub const VIEW_ID: &str = "layer-composer";

const GALLERY_REF: &str = "galleryRef";

/// Immutable deep copy of everything undo/redo restores
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub layers: Vec<Layer>,
    pub canvas: CanvasSettings,
}

/// The live document: layers plus canvas settings
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub store: LayerStore,
    canvas: CanvasSettings,
    canvas_revision: u64,
}

/// What a `.json` file turned out to contain
#[derive(Debug)]
pub enum LoadedFile {
    Document(Document),
    /// Canvas settings only, applied on top of the current document
    Preset(CanvasSettings),
}

impl Document {
    pub fn new(canvas: CanvasSettings) -> Self {
        Self {
            store: LayerStore::new(),
            canvas,
            canvas_revision: 0,
        }
    }

    pub fn canvas(&self) -> &CanvasSettings {
        &self.canvas
    }

    /// Edits canvas settings in place, counting as a document change only if
    /// something actually changed
    pub fn update_canvas(&mut self, f: impl FnOnce(&mut CanvasSettings)) -> bool {
        let before = self.canvas.clone();
        f(&mut self.canvas);
        let changed = self.canvas != before;
        if changed {
            self.canvas_revision += 1;
        }
        changed
    }

    pub fn set_canvas(&mut self, canvas: CanvasSettings) -> bool {
        self.update_canvas(|current| *current = canvas)
    }

    /// Monotonic change counter over layers and canvas settings
    pub fn revision(&self) -> u64 {
        self.store.revision() + self.canvas_revision
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            layers: self.store.layers().to_vec(),
            canvas: self.canvas.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.store.replace_all(snapshot.layers);
        self.set_canvas(snapshot.canvas);
    }

    /// `{ viewId, state: { layers, canvasSettings } }` with inline image urls
    pub fn serialize(&self) -> Value {
        json!({
            "viewId": VIEW_ID,
            "state": {
                "layers": self.store.serialize(),
                "canvasSettings": serde_json::to_value(&self.canvas).unwrap_or(Value::Null),
            }
        })
    }

    /// Saves to a JSON string. With a gallery, image urls the gallery already
    /// holds are written as `{ "type": "galleryRef", "index": n }`.
    pub fn to_json(&self, gallery: Option<&dyn Gallery>) -> Result<String, DocumentError> {
        let mut value = self.serialize();
        if let Some(gallery) = gallery {
            if let Some(layers) = value.pointer_mut("/state/layers") {
                compact_gallery_refs(layers, gallery);
            }
        }
        Ok(serde_json::to_string_pretty(&value)?)
    }

    pub fn deserialize(value: Value, gallery: Option<&dyn Gallery>) -> Result<Self, DocumentError> {
        match load_file(value, gallery)? {
            LoadedFile::Document(document) => Ok(document),
            LoadedFile::Preset(_) => Err(DocumentError::Invalid("file has no layers".to_owned())),
        }
    }

    pub fn from_json(json: &str, gallery: Option<&dyn Gallery>) -> Result<Self, DocumentError> {
        Self::deserialize(serde_json::from_str(json)?, gallery)
    }
}

/// Parses a saved document or preset, resolving gallery references against
/// `gallery`. A reference to a missing gallery entry becomes a `null` url
/// rather than failing the load.
pub fn load_file(mut value: Value, gallery: Option<&dyn Gallery>) -> Result<LoadedFile, DocumentError> {
    let Some(object) = value.as_object_mut() else {
        return Err(DocumentError::Invalid("expected a JSON object".to_owned()));
    };

    match object.get("viewId").and_then(Value::as_str) {
        Some(VIEW_ID) => {}
        Some(other) => {
            return Err(DocumentError::UnknownView {
                found: other.to_owned(),
                expected: VIEW_ID.to_owned(),
            });
        }
        None => return Err(DocumentError::Invalid("missing viewId".to_owned())),
    }

    let state = object
        .get_mut("state")
        .and_then(Value::as_object_mut)
        .ok_or(DocumentError::MissingState)?;

    let canvas = match state.remove("canvasSettings") {
        Some(Value::Null) | None => CanvasSettings::default(),
        Some(settings) => serde_json::from_value(settings)?,
    };

    let Some(mut layers) = state.remove("layers") else {
        info!("Loaded preset");
        return Ok(LoadedFile::Preset(canvas));
    };

    resolve_gallery_refs(&mut layers, gallery);
    let store = LayerStore::deserialize(layers)?;
    info!("Loaded document with {} layers", store.len());

    let mut document = Document::new(canvas);
    document.store = store;
    Ok(LoadedFile::Document(document))
}

pub fn parse_file(json: &str, gallery: Option<&dyn Gallery>) -> Result<LoadedFile, DocumentError> {
    load_file(serde_json::from_str(json)?, gallery)
}

fn image_urls_mut(layers: &mut Value) -> impl Iterator<Item = &mut Value> {
    layers
        .as_array_mut()
        .into_iter()
        .flatten()
        .filter(|layer| layer.get("type").and_then(Value::as_str) == Some("image"))
        .filter_map(|layer| layer.get_mut("url"))
}

fn resolve_gallery_refs(layers: &mut Value, gallery: Option<&dyn Gallery>) {
    for url in image_urls_mut(layers) {
        if url.get("type").and_then(Value::as_str) != Some(GALLERY_REF) {
            continue;
        }
        let index = url.get("index").and_then(Value::as_u64);
        let resolved = index.and_then(|index| gallery?.get(index as usize));
        if resolved.is_none() {
            warn!("Gallery reference {:?} does not resolve, leaving image empty", index);
        }
        *url = resolved.map_or(Value::Null, Value::String);
    }
}

fn compact_gallery_refs(layers: &mut Value, gallery: &dyn Gallery) {
    let entries = gallery.list_all();
    for url in image_urls_mut(layers) {
        let Some(index) = url
            .as_str()
            .and_then(|current| entries.iter().position(|entry| entry == current))
        else {
            continue;
        };
        *url = json!({ "type": GALLERY_REF, "index": index });
    }
}
