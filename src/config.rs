use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{HANDLE_RADIUS, MIN_LAYER_SIZE};
use crate::history::DEFAULT_HISTORY_DEPTH;

/// Tunables for the composer. Missing fields take their defaults, so a
/// config file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Undo steps kept before the oldest is dropped
    pub history_depth: usize,
    /// Concurrent backend calls in batch mode
    pub generation_workers: usize,
    pub min_layer_size: f32,
    pub handle_radius: f32,
    /// Distance within which a dragged selection snaps to a neighbour's edges
    pub guide_threshold: f32,
    /// Rotation step while shift is held
    pub rotation_snap_degrees: f32,
    pub duplicate_offset: f32,
    pub nudge_step: f32,
    pub nudge_step_large: f32,
    /// Horizontal gap between a source layer and a generated result placed next to it
    pub result_gap: f32,
    /// Size of a shape created by a click without dragging
    pub default_shape_size: f32,
    /// Dropped images larger than this on either axis are scaled down to fit
    pub max_dropped_image_size: f32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            history_depth: DEFAULT_HISTORY_DEPTH,
            generation_workers: 2,
            min_layer_size: MIN_LAYER_SIZE,
            handle_radius: HANDLE_RADIUS,
            guide_threshold: 5.0,
            rotation_snap_degrees: 15.0,
            duplicate_offset: 10.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            result_gap: 20.0,
            default_shape_size: 100.0,
            max_dropped_image_size: 512.0,
        }
    }
}

impl ComposerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.validated())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamps values that would make the engine misbehave
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        self.history_depth = self.history_depth.max(1);
        self.generation_workers = self.generation_workers.max(1);
        if !(self.min_layer_size > 0.0) {
            self.min_layer_size = defaults.min_layer_size;
        }
        if !(self.handle_radius > 0.0) {
            self.handle_radius = defaults.handle_radius;
        }
        self.guide_threshold = self.guide_threshold.max(0.0);
        self.rotation_snap_degrees = self.rotation_snap_degrees.max(0.0);
        self.default_shape_size = self.default_shape_size.max(self.min_layer_size);
        if !(self.max_dropped_image_size > 0.0) {
            self.max_dropped_image_size = defaults.max_dropped_image_size;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = ComposerConfig::from_json_str(r#"{ "generation_workers": 4 }"#).unwrap();
        assert_eq!(config.generation_workers, 4);
        assert_eq!(config.history_depth, DEFAULT_HISTORY_DEPTH);
    }

    #[test]
    fn zero_workers_are_clamped() {
        let config = ComposerConfig::from_json_str(r#"{ "generation_workers": 0, "history_depth": 0 }"#).unwrap();
        assert_eq!(config.generation_workers, 1);
        assert_eq!(config.history_depth, 1);
    }
}
