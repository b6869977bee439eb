use crate::document::Document;
use crate::history::HistoryManager;
use crate::store::LayerStore;

/// What an edit needs: the live document and the history that checkpoints it
#[derive(Debug)]
pub struct EditContext<'a> {
    pub document: &'a mut Document,
    pub history: &'a mut HistoryManager,
}

impl<'a> EditContext<'a> {
    pub fn new(document: &'a mut Document, history: &'a mut HistoryManager) -> Self {
        Self { document, history }
    }

    pub fn store(&mut self) -> &mut LayerStore {
        &mut self.document.store
    }

    pub fn begin_interaction(&mut self) {
        self.history.begin_interaction(self.document);
    }

    pub fn commit(&mut self) {
        self.history.commit(self.document);
    }
}
