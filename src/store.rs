use std::collections::HashSet;

use egui::{Pos2, vec2};
use log::{debug, warn};

use crate::error::StoreError;
use crate::layer::{Layer, LayerId, LayerPatch};

/// Where a set of layers should move in the stacking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrderMove {
    Forward,
    Backward,
    ToFront,
    ToBack,
}

/// Ordered collection of layers. Index 0 is the bottom of the stack.
///
/// Every effective mutation bumps [`LayerStore::revision`], which is the only
/// "dirty" signal the history sees. The store never snapshots itself.
#[derive(Debug, Clone, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
    revision: u64,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layers(layers: Vec<Layer>) -> Self {
        let mut store = Self::new();
        store.replace_all(layers);
        store
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn ids(&self) -> Vec<LayerId> {
        self.layers.iter().map(|layer| layer.id).collect()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.index_of(id).is_some()
    }

    /// Stacking position of `id` (0 = bottom)
    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id == id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn fresh_id(&self) -> LayerId {
        loop {
            let id = LayerId::new();
            if !self.contains(id) {
                return id;
            }
        }
    }

    /// Adds a layer on top of the stack. A colliding id is replaced with a
    /// fresh one; the id actually stored is returned.
    pub fn add(&mut self, mut layer: Layer) -> LayerId {
        if self.contains(layer.id) {
            let fresh = self.fresh_id();
            warn!("Layer id {} already in use, reassigning to {}", layer.id, fresh);
            layer.id = fresh;
        }
        let id = layer.id;
        debug!("Adding {} layer {}", layer.kind(), id);
        self.layers.push(layer);
        self.touch();
        id
    }

    /// Applies `patch` to layer `id`. Missing ids are ignored: results may
    /// arrive for layers that were deleted in the meantime.
    pub fn update(&mut self, id: LayerId, patch: &LayerPatch) -> bool {
        self.update_with(id, |layer| patch.apply(layer))
    }

    /// Mutates layer `id` in place. `f` reports whether it changed anything.
    pub fn update_with(&mut self, id: LayerId, f: impl FnOnce(&mut Layer) -> bool) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|layer| layer.id == id) else {
            debug!("Ignoring update for missing layer {}", id);
            return false;
        };

        // The id is the layer's identity; it may not be rewritten in place
        let changed = f(layer);
        layer.id = id;
        if changed {
            self.touch();
        }
        changed
    }

    pub fn remove(&mut self, id: LayerId) -> Option<Layer> {
        let index = self.index_of(id)?;
        let layer = self.layers.remove(index);
        debug!("Removed layer {}", id);
        self.touch();
        Some(layer)
    }

    /// Rearranges the stack into `order` (bottom to top). `order` must be a
    /// permutation of the current ids; anything else is rejected and the
    /// store is left as it was.
    pub fn reorder(&mut self, order: &[LayerId]) -> Result<(), StoreError> {
        if order.len() != self.layers.len() {
            return Err(StoreError::ReorderLength {
                given: order.len(),
                expected: self.layers.len(),
            });
        }

        let mut seen = HashSet::with_capacity(order.len());
        for &id in order {
            if !self.contains(id) {
                return Err(StoreError::UnknownLayer(id));
            }
            if !seen.insert(id) {
                return Err(StoreError::DuplicateLayer(id));
            }
        }

        if self.ids() == order {
            return Ok(());
        }

        let mut remaining = std::mem::take(&mut self.layers);
        for &id in order {
            if let Some(index) = remaining.iter().position(|layer| layer.id == id) {
                self.layers.push(remaining.swap_remove(index));
            }
        }
        self.touch();
        Ok(())
    }

    /// Computes the stacking order after moving `ids` and applies it through
    /// [`LayerStore::reorder`]. Returns whether the order changed.
    pub fn move_layers(&mut self, ids: &[LayerId], movement: ZOrderMove) -> bool {
        let moving: HashSet<LayerId> = ids.iter().copied().filter(|id| self.contains(*id)).collect();
        if moving.is_empty() {
            return false;
        }

        let mut order = self.ids();
        match movement {
            ZOrderMove::ToFront => {
                let (picked, rest): (Vec<_>, Vec<_>) = order.into_iter().partition(|id| moving.contains(id));
                order = rest.into_iter().chain(picked).collect();
            }
            ZOrderMove::ToBack => {
                let (picked, rest): (Vec<_>, Vec<_>) = order.into_iter().partition(|id| moving.contains(id));
                order = picked.into_iter().chain(rest).collect();
            }
            ZOrderMove::Forward => {
                // Walk from the top so a moving layer never hops over another moving one
                for i in (0..order.len().saturating_sub(1)).rev() {
                    if moving.contains(&order[i]) && !moving.contains(&order[i + 1]) {
                        order.swap(i, i + 1);
                    }
                }
            }
            ZOrderMove::Backward => {
                for i in 1..order.len() {
                    if moving.contains(&order[i]) && !moving.contains(&order[i - 1]) {
                        order.swap(i, i - 1);
                    }
                }
            }
        }

        let before = self.revision;
        if let Err(err) = self.reorder(&order) {
            warn!("Z-order change rejected: {}", err);
        }
        self.revision != before
    }

    /// Deep-copies layer `id` under a fresh id, offset by `offset` on both
    /// axes and stacked directly above the original.
    pub fn duplicate(&mut self, id: LayerId, offset: f32) -> Option<LayerId> {
        let index = self.index_of(id)?;
        let mut copy = self.layers[index].clone();
        copy.id = self.fresh_id();
        copy.translate(vec2(offset, offset));
        if !copy.name.is_empty() {
            copy.name = format!("{} copy", copy.name);
        }

        let new_id = copy.id;
        self.layers.insert(index + 1, copy);
        self.touch();
        debug!("Duplicated layer {} as {}", id, new_id);
        Some(new_id)
    }

    /// Swaps in a whole new layer list (history restore, document load).
    /// Duplicate ids in the incoming data are reassigned and negative sizes
    /// are clamped to zero.
    pub fn replace_all(&mut self, layers: Vec<Layer>) {
        let mut seen = HashSet::with_capacity(layers.len());
        self.layers = layers
            .into_iter()
            .map(|mut layer| {
                while !seen.insert(layer.id) {
                    let fresh = LayerId::new();
                    warn!("Duplicate layer id {} in loaded data, reassigning to {}", layer.id, fresh);
                    layer.id = fresh;
                }
                if !(layer.width >= 0.0 && layer.height >= 0.0) {
                    warn!("Layer {} has size {}x{}, clamping", layer.id, layer.width, layer.height);
                    layer.width = layer.width.max(0.0);
                    layer.height = layer.height.max(0.0);
                }
                layer
            })
            .collect();
        self.touch();
    }

    pub fn clear(&mut self) {
        if !self.layers.is_empty() {
            self.layers.clear();
            self.touch();
        }
    }

    /// Topmost visible, unlocked layer under `point`
    pub fn hit_test(&self, point: Pos2) -> Option<LayerId> {
        self.layers
            .iter()
            .rev()
            .filter(|layer| layer.is_visible && !layer.is_locked)
            .find(|layer| layer.contains_point(point))
            .map(|layer| layer.id)
    }

    /// Layers serialized in stacking order, bottom first
    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(&self.layers).unwrap_or_else(|err| {
            // Layers are plain data; this only fails on non-finite floats
            warn!("Failed to serialize layers: {}", err);
            serde_json::Value::Array(Vec::new())
        })
    }

    pub fn deserialize(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let layers: Vec<Layer> = serde_json::from_value(value)?;
        Ok(Self::from_layers(layers))
    }
}
