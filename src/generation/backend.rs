use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::{ImageRef, JobId};
use crate::layer::Layer;

/// A failure reported by the generation backend. The message is shown to
/// the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Passed through to the backend untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerationOptions {
    pub aspect_ratio: Option<String>,
    pub seed: Option<u64>,
}

/// The generative-AI service. Calls may run concurrently from several workers.
pub trait GenerationBackend: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        images: &[ImageRef],
        options: &GenerationOptions,
    ) -> BoxFuture<'static, Result<Vec<ImageRef>, BackendError>>;
}

/// Backend used when no service is configured; every call fails
#[derive(Debug, Default)]
pub struct UnavailableBackend;

impl GenerationBackend for UnavailableBackend {
    fn generate(
        &self,
        _prompt: &str,
        _images: &[ImageRef],
        _options: &GenerationOptions,
    ) -> BoxFuture<'static, Result<Vec<ImageRef>, BackendError>> {
        Box::pin(future::ready(Err(BackendError::new(
            "No generation backend is configured",
        ))))
    }
}

/// Metadata embedded into generated images
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub job: JobId,
    pub prompt: String,
}

pub trait ProvenanceStamp: Send + Sync {
    fn embed(&self, image: ImageRef, provenance: &Provenance) -> BoxFuture<'static, Result<ImageRef, BackendError>>;
}

/// Turns a layer into an input image for the backend
pub trait LayerRasterizer {
    fn rasterize(&self, layer: &Layer) -> Option<ImageRef>;
}

/// Passes image layer urls through as-is. Text and shape layers, and image
/// layers without a url, cannot be rendered.
#[derive(Debug, Default, Clone, Copy)]
pub struct SourceImageRasterizer;

impl LayerRasterizer for SourceImageRasterizer {
    fn rasterize(&self, layer: &Layer) -> Option<ImageRef> {
        layer.image_url().map(str::to_owned)
    }
}
