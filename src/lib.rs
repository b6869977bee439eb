#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod canvas;
pub mod composer;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod file_handler;
pub mod gallery;
pub mod generation;
pub mod geometry;
pub mod history;
mod id_generator;
pub mod input;
pub mod layer;
mod panels;
pub mod renderer;
pub mod selection;
pub mod store;
mod texture_manager;

pub use app::ComposerApp;
pub use canvas::{CanvasSettings, GridSettings, GuideSettings};
pub use composer::{Composer, LoadOutcome};
pub use config::ComposerConfig;
pub use controller::{EditContext, InteractionController, InteractionState, ToolMode};
pub use document::{Document, LoadedFile, Snapshot};
pub use error::{ConfigError, DocumentError, DropError, StoreError};
pub use gallery::{Gallery, MemoryGallery};
pub use generation::{
    BackendError, GenerationBackend, GenerationJob, GenerationMode, GenerationOptions,
    GenerationRequest, JobBoard, JobEvent, JobStatus, ResultTarget, UnavailableBackend,
};
pub use history::HistoryManager;
pub use layer::{BlendMode, Layer, LayerContent, LayerId, LayerPatch, ShapeStyle, ShapeType, TextStyle};
pub use renderer::Renderer;
pub use selection::Selection;
pub use store::{LayerStore, ZOrderMove};
