use thiserror::Error;

use crate::layer::LayerId;

/// Rejected layer store mutations. The store is left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Reorder lists {given} ids but the store holds {expected}")]
    ReorderLength { given: usize, expected: usize },

    #[error("Reorder references unknown layer {0}")]
    UnknownLayer(LayerId),

    #[error("Reorder lists layer {0} more than once")]
    DuplicateLayer(LayerId),
}

/// Errors that abort loading a document or preset. The live document is
/// never touched when one of these is returned.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to parse document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Document belongs to view '{found}', expected '{expected}'")]
    UnknownView { found: String, expected: String },

    #[error("Document has no state")]
    MissingState,

    #[error("Invalid document data: {0}")]
    Invalid(String),
}

/// Errors loading a [`crate::ComposerConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors handling a dropped file
#[derive(Debug, Error)]
pub enum DropError {
    #[error("Dropped file '{0}' has no accessible data")]
    NoData(String),

    #[error("Failed to read dropped file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Dropped file '{0}' is not a supported type")]
    Unsupported(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}
