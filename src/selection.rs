use crate::layer::LayerId;
use crate::store::LayerStore;

/// The set of selected layer ids, in the order they were selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<LayerId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[LayerId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.ids.contains(&id)
    }

    /// The selected layer when exactly one is selected
    pub fn single(&self) -> Option<LayerId> {
        match self.ids.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    pub fn select_only(&mut self, id: LayerId) {
        self.ids.clear();
        self.ids.push(id);
    }

    pub fn add(&mut self, id: LayerId) {
        if !self.contains(id) {
            self.ids.push(id);
        }
    }

    /// Flips membership of `id`, returning whether it is now selected
    pub fn toggle(&mut self, id: LayerId) -> bool {
        if let Some(index) = self.ids.iter().position(|selected| *selected == id) {
            self.ids.remove(index);
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn set(&mut self, ids: impl IntoIterator<Item = LayerId>) {
        self.ids.clear();
        for id in ids {
            self.add(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops ids the store no longer holds
    pub fn retain_existing(&mut self, store: &LayerStore) {
        self.ids.retain(|id| store.contains(*id));
    }

    /// Selected ids in stacking order, bottom first
    pub fn in_stack_order(&self, store: &LayerStore) -> Vec<LayerId> {
        store
            .iter()
            .map(|layer| layer.id)
            .filter(|id| self.contains(*id))
            .collect()
    }
}
