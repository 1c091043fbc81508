//! Document arena with an identity-to-slot lookup.

use crate::document::DocId;
use serde_json::Value;

/// Ordered document storage.
///
/// Documents are kept in ascending identity order, which is insertion order
/// because identities are allocated monotonically. Slots ("positions") are
/// stable until the next removal.
#[derive(Debug, Default, Clone)]
pub(crate) struct DocStore {
    docs: Vec<Value>,
    ids: Vec<DocId>,
}

impl DocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from documents, sorting them by identity.
    pub fn from_documents(mut entries: Vec<(DocId, Value)>) -> Self {
        entries.sort_by_key(|(id, _)| *id);
        let (ids, docs) = entries.into_iter().unzip();
        Self { docs, ids }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, pos: usize) -> &Value {
        &self.docs[pos]
    }

    pub fn id_at(&self, pos: usize) -> DocId {
        self.ids[pos]
    }

    pub fn position(&self, id: DocId) -> Option<usize> {
        self.ids.binary_search(&id).ok()
    }

    pub fn by_id(&self, id: DocId) -> Option<&Value> {
        self.position(id).map(|pos| &self.docs[pos])
    }

    pub fn contains(&self, id: DocId) -> bool {
        self.position(id).is_some()
    }

    /// Appends a document. `id` must exceed every stored identity.
    pub fn push(&mut self, id: DocId, doc: Value) {
        debug_assert!(self.ids.last().map_or(true, |last| *last < id));
        self.ids.push(id);
        self.docs.push(doc);
    }

    /// Replaces the document in `pos`, returning the previous one.
    pub fn replace(&mut self, pos: usize, doc: Value) -> Value {
        std::mem::replace(&mut self.docs[pos], doc)
    }

    pub fn remove(&mut self, pos: usize) -> Value {
        self.ids.remove(pos);
        self.docs.remove(pos)
    }

    pub fn clear(&mut self) {
        self.docs.clear();
        self.ids.clear();
    }

    pub fn docs(&self) -> &[Value] {
        &self.docs
    }

    pub fn ids(&self) -> &[DocId] {
        &self.ids
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Value)> {
        self.ids.iter().copied().zip(self.docs.iter())
    }
}
