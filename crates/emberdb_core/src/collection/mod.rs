//! Collections of schema-flexible documents.
//!
//! A [`Collection`] owns its documents, assigns identities, stamps
//! metadata, keeps binary and unique indices consistent, feeds its dynamic
//! views and records an optional change log.
//!
//! ```rust
//! use emberdb_core::{Collection, CollectionOptions};
//! use serde_json::json;
//!
//! let mut users = Collection::new("users", CollectionOptions::new().unique("email"));
//! let alice = users.insert_one(json!({"email": "alice@example.com"})).unwrap();
//! assert_eq!(alice["$id"], 1);
//! assert_eq!(alice["meta"]["revision"], 0);
//!
//! let dup = users.insert_one(json!({"email": "alice@example.com"}));
//! assert!(dup.is_err());
//! ```

mod changes;
mod index;
mod serial;
mod store;
mod transform;
mod ttl;
mod typed;

pub use changes::{Change, ChangeOp};
pub use serial::SerializedCollection;
pub use transform::{TransformStep, PARAM_PREFIX};

pub(crate) use index::canonical_key;
pub(crate) use store::DocStore;
pub(crate) use transform::substitute;

use crate::config::{CollectionOptions, DynamicViewOptions};
use crate::document::{doc_id, now_millis, DocId, Meta, ID_FIELD, META_FIELD};
use crate::dynamic_view::{DynamicView, DynamicViewMut, DynamicViewRef};
use crate::error::{DbError, DbResult};
use crate::events::{CollectionEvent, EventFeed};
use crate::query::{IntoQuery, Query};
use crate::resultset::ResultSet;
use crate::stats::{CollectionStats, CollectionSummary};
use crate::task::PeriodicTask;
use index::{BinaryIndex, UniqueIndex};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to a collection owned by a database.
pub type CollectionHandle = Arc<RwLock<Collection>>;

/// A named, ordered set of documents with indices and views.
pub struct Collection {
    name: String,
    options: CollectionOptions,
    store: DocStore,
    max_id: DocId,
    binary_indices: BTreeMap<String, BinaryIndex>,
    unique_indices: BTreeMap<String, UniqueIndex>,
    transforms: HashMap<String, Vec<TransformStep>>,
    views: Vec<DynamicView>,
    changes: Vec<Change>,
    dirty: bool,
    events: EventFeed<CollectionEvent>,
    stats: CollectionStats,
    ttl_task: Option<PeriodicTask>,
}

impl Collection {
    /// Creates an empty collection.
    ///
    /// Index and unique fields named in `options` are set up immediately.
    /// TTL expiry only starts once the collection is shared through a
    /// handle, see [`Collection::set_ttl`].
    pub fn new(name: impl Into<String>, options: CollectionOptions) -> Self {
        let name = name.into();
        let store = DocStore::new();
        let binary_indices = options
            .indices
            .iter()
            .map(|field| (field.clone(), BinaryIndex::build(field, &store)))
            .collect();
        let unique_indices = options
            .unique
            .iter()
            .map(|field| (field.clone(), UniqueIndex::new(field)))
            .collect();
        debug!(collection = %name, "collection created");
        Self {
            name,
            options,
            store,
            max_id: 0,
            binary_indices,
            unique_indices,
            transforms: HashMap::new(),
            views: Vec::new(),
            changes: Vec::new(),
            dirty: false,
            events: EventFeed::new(),
            stats: CollectionStats::new(),
            ttl_task: None,
        }
    }

    /// Wraps the collection in a shareable handle.
    pub fn into_handle(self) -> CollectionHandle {
        Arc::new(RwLock::new(self))
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        for change in &mut self.changes {
            change.name.clone_from(&name);
        }
        self.name = name;
    }

    /// Collection options.
    pub fn options(&self) -> &CollectionOptions {
        &self.options
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if the collection holds no documents.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Highest identity handed out so far.
    pub fn max_id(&self) -> DocId {
        self.max_id
    }

    pub(crate) fn store(&self) -> &DocStore {
        &self.store
    }

    /// Operation counters.
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// Returns true if the collection has unsaved mutations.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Subscribes to insert, update and delete notifications.
    pub fn subscribe(&self) -> Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: impl FnOnce() -> CollectionEvent) {
        if self.events.has_subscribers() {
            self.events.emit(event());
        }
    }

    fn unique_violation(&self, field: &str, value: String) -> DbError {
        DbError::UniqueViolation {
            collection: self.name.clone(),
            field: field.to_string(),
            value,
        }
    }

    fn check_unique(&self, doc: &Value, own: Option<DocId>) -> DbResult<()> {
        for index in self.unique_indices.values() {
            if let Some(key) = index.conflict(doc, own) {
                return Err(self.unique_violation(index.field(), key));
            }
        }
        Ok(())
    }

    fn log_change(&mut self, operation: ChangeOp, obj: Value) {
        if !self.options.disable_changes_api {
            self.changes.push(Change {
                name: self.name.clone(),
                operation,
                obj,
            });
        }
    }

    fn validate_new(doc: &Value) -> DbResult<()> {
        let map = doc
            .as_object()
            .ok_or_else(|| DbError::invalid_document("documents must be JSON objects"))?;
        if map.contains_key(ID_FIELD) {
            return Err(DbError::invalid_document(
                "document already carries an $id, use update instead",
            ));
        }
        Ok(())
    }

    fn commit_insert(&mut self, mut doc: Value) -> Value {
        self.max_id += 1;
        let id = self.max_id;
        if let Some(map) = doc.as_object_mut() {
            map.insert(ID_FIELD.to_string(), Value::from(id));
            if !self.options.disable_meta {
                map.insert(
                    META_FIELD.to_string(),
                    Meta::created_at(now_millis()).to_value(),
                );
            }
        }

        for index in self.unique_indices.values_mut() {
            index.insert(&doc, id);
        }
        let adaptive = self.options.adaptive_binary_indices;
        for index in self.binary_indices.values_mut() {
            if adaptive {
                index.insert(&doc, id);
            } else {
                index.mark_dirty();
            }
        }
        self.store.push(id, doc.clone());
        for view in &mut self.views {
            view.on_insert(id, &doc, &self.store);
        }

        self.log_change(ChangeOp::Insert, doc.clone());
        self.dirty = true;
        self.stats.record_insert();
        self.emit(|| CollectionEvent::Insert { doc: doc.clone() });
        doc
    }

    /// Inserts one document and returns it as stored.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidDocument`] if `doc` is not an object or already
    /// carries an identity, [`DbError::UniqueViolation`] on a duplicate
    /// unique value. Nothing is stored on error.
    pub fn insert_one(&mut self, doc: Value) -> DbResult<Value> {
        Self::validate_new(&doc)?;
        self.check_unique(&doc, None)?;
        Ok(self.commit_insert(doc))
    }

    /// Inserts a batch of documents.
    ///
    /// The batch is validated as a whole first, including duplicates of a
    /// unique value inside the batch, so either every document is stored or
    /// none is.
    ///
    /// # Errors
    ///
    /// As for [`insert_one`](Self::insert_one).
    pub fn insert(&mut self, docs: Vec<Value>) -> DbResult<Vec<Value>> {
        for doc in &docs {
            Self::validate_new(doc)?;
            self.check_unique(doc, None)?;
        }
        for index in self.unique_indices.values() {
            let mut batch = HashSet::new();
            for key in docs.iter().filter_map(|doc| index.key(doc)) {
                if !batch.insert(key.clone()) {
                    return Err(self.unique_violation(index.field(), key));
                }
            }
        }
        Ok(docs.into_iter().map(|doc| self.commit_insert(doc)).collect())
    }

    /// Replaces a stored document, identified by its `$id` field.
    ///
    /// The stored metadata is carried forward: the revision is incremented
    /// and `updated` stamped, whatever `meta` the caller passed.
    ///
    /// # Errors
    ///
    /// - [`DbError::InvalidDocument`] if `doc` has no `$id` or is not an object
    /// - [`DbError::DocumentNotFound`] if no live document has that identity
    /// - [`DbError::UniqueViolation`] if a unique value collides with another document
    pub fn update_one(&mut self, mut doc: Value) -> DbResult<Value> {
        if !doc.is_object() {
            return Err(DbError::invalid_document("documents must be JSON objects"));
        }
        let id = doc_id(&doc)
            .ok_or_else(|| DbError::invalid_document("update requires the $id field"))?;
        let pos = self
            .store
            .position(id)
            .ok_or_else(|| DbError::document_not_found(&self.name, id))?;
        self.check_unique(&doc, Some(id))?;

        if !self.options.disable_meta {
            let now = now_millis();
            let meta = Meta::of(self.store.get(pos))
                .unwrap_or_else(|| Meta::created_at(now))
                .bumped(now);
            if let Some(map) = doc.as_object_mut() {
                map.insert(META_FIELD.to_string(), meta.to_value());
            }
        }

        let old = self.store.replace(pos, doc.clone());
        for index in self.unique_indices.values_mut() {
            index.remove(&old, id);
            index.insert(&doc, id);
        }
        let adaptive = self.options.adaptive_binary_indices;
        for index in self.binary_indices.values_mut() {
            if adaptive {
                index.update(&old, &doc, id);
            } else {
                index.mark_dirty();
            }
        }
        for view in &mut self.views {
            view.on_update(id, &doc, &self.store);
        }

        let logged = if self.options.disable_delta_changes_api {
            doc.clone()
        } else {
            changes::delta(&old, &doc)
        };
        self.log_change(ChangeOp::Update, logged);
        self.dirty = true;
        self.stats.record_update();
        self.emit(|| CollectionEvent::Update {
            doc: doc.clone(),
            old,
        });
        Ok(doc)
    }

    /// Updates documents one after another.
    ///
    /// # Errors
    ///
    /// Stops at the first failing document; earlier updates are kept.
    pub fn update(&mut self, docs: Vec<Value>) -> DbResult<Vec<Value>> {
        docs.into_iter().map(|doc| self.update_one(doc)).collect()
    }

    /// Removes the document with identity `id` and returns it.
    ///
    /// # Errors
    ///
    /// [`DbError::DocumentNotFound`] if the identity is not live.
    pub fn remove_by_id(&mut self, id: DocId) -> DbResult<Value> {
        let pos = self
            .store
            .position(id)
            .ok_or_else(|| DbError::document_not_found(&self.name, id))?;
        let old = self.store.remove(pos);

        for index in self.unique_indices.values_mut() {
            index.remove(&old, id);
        }
        let adaptive = self.options.adaptive_binary_indices;
        for index in self.binary_indices.values_mut() {
            if adaptive {
                index.remove(&old, id);
            } else {
                index.mark_dirty();
            }
        }
        for view in &mut self.views {
            view.on_remove(id);
        }

        self.log_change(ChangeOp::Remove, old.clone());
        self.dirty = true;
        self.stats.record_remove();
        self.emit(|| CollectionEvent::Delete { id });
        Ok(old)
    }

    /// Removes the stored document `doc` refers to through its `$id`.
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidDocument`] without `$id`, otherwise as
    /// [`remove_by_id`](Self::remove_by_id).
    pub fn remove_one(&mut self, doc: &Value) -> DbResult<Value> {
        let id = doc_id(doc)
            .ok_or_else(|| DbError::invalid_document("remove requires the $id field"))?;
        self.remove_by_id(id)
    }

    /// Removes several documents by identity, returning how many were removed.
    ///
    /// # Errors
    ///
    /// [`DbError::DocumentNotFound`] if any identity is not live; nothing is
    /// removed in that case.
    pub fn remove(&mut self, ids: &[DocId]) -> DbResult<usize> {
        if let Some(&missing) = ids.iter().find(|&&id| !self.store.contains(id)) {
            return Err(DbError::document_not_found(&self.name, missing));
        }
        let mut removed = 0;
        for &id in ids {
            if self.store.contains(id) {
                self.remove_by_id(id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// The stored document with identity `id`.
    pub fn get(&self, id: DocId) -> Option<&Value> {
        self.store.by_id(id)
    }

    /// Every document matching `query`, in collection order.
    ///
    /// # Errors
    ///
    /// Fails if `query` is malformed.
    pub fn find(&self, query: impl IntoQuery) -> DbResult<Vec<Value>> {
        Ok(self.chain().find(query)?.data())
    }

    /// The first document matching `query`.
    ///
    /// # Errors
    ///
    /// Fails if `query` is malformed.
    pub fn find_one(&self, query: impl IntoQuery) -> DbResult<Option<Value>> {
        Ok(self.chain().find(query)?.first().cloned())
    }

    /// Number of documents matching `query`.
    ///
    /// # Errors
    ///
    /// Fails if `query` is malformed.
    pub fn count(&self, query: impl IntoQuery) -> DbResult<usize> {
        let query = query.into_query()?;
        if query.is_all() {
            return Ok(self.len());
        }
        Ok(self.chain().find(query)?.count())
    }

    /// Direct lookup through the unique index on `field`.
    ///
    /// # Errors
    ///
    /// [`DbError::FieldNotUnique`] if `field` carries no unique constraint.
    pub fn by(&self, field: &str, value: &Value) -> DbResult<Option<&Value>> {
        let index = self
            .unique_indices
            .get(field)
            .ok_or_else(|| DbError::FieldNotUnique {
                collection: self.name.clone(),
                field: field.to_string(),
            })?;
        Ok(index.get(value).and_then(|id| self.store.by_id(id)))
    }

    /// Applies `f` to every document matching `query`, returning the count.
    ///
    /// # Errors
    ///
    /// Fails on a malformed query or on the first failing update.
    pub fn find_and_update(
        &mut self,
        query: impl IntoQuery,
        f: impl FnMut(&mut Value),
    ) -> DbResult<usize> {
        let rs = self.chain_mut().find(query)?;
        let count = rs.count();
        rs.update(f)?;
        Ok(count)
    }

    /// Removes every document matching `query`, returning the count.
    ///
    /// # Errors
    ///
    /// Fails on a malformed query.
    pub fn find_and_remove(&mut self, query: impl IntoQuery) -> DbResult<usize> {
        let rs = self.chain_mut().find(query)?;
        let count = rs.count();
        rs.remove()?;
        Ok(count)
    }

    /// Applies `f` to every document accepted by `predicate`.
    ///
    /// # Errors
    ///
    /// Stops at the first failing update.
    pub fn update_where(
        &mut self,
        predicate: impl Fn(&Value) -> bool,
        f: impl FnMut(&mut Value),
    ) -> DbResult<usize> {
        let rs = self.chain_mut().filter(predicate);
        let count = rs.count();
        rs.update(f)?;
        Ok(count)
    }

    /// Removes every document accepted by `predicate`.
    ///
    /// # Errors
    ///
    /// Propagates removal errors.
    pub fn remove_where(&mut self, predicate: impl Fn(&Value) -> bool) -> DbResult<usize> {
        let rs = self.chain_mut().filter(predicate);
        let count = rs.count();
        rs.remove()?;
        Ok(count)
    }

    /// A read cursor over every document.
    pub fn chain(&self) -> ResultSet<&Collection> {
        ResultSet::new(self)
    }

    /// A cursor that can also update and remove the documents it selects.
    pub fn chain_mut(&mut self) -> ResultSet<&mut Collection> {
        ResultSet::new(self)
    }

    pub(crate) fn clean_index(&self, field: &str) -> Option<&BinaryIndex> {
        self.binary_indices.get(field).filter(|index| !index.is_dirty())
    }

    pub(crate) fn index_candidates(&self, query: &Query) -> Option<Vec<DocId>> {
        let (field, op) = query.index_probe()?;
        self.clean_index(field)?.probe(op)
    }

    /// Fields carrying a binary index.
    pub fn binary_index_fields(&self) -> Vec<String> {
        self.binary_indices.keys().cloned().collect()
    }

    /// Fields carrying a unique constraint.
    pub fn unique_fields(&self) -> Vec<String> {
        self.unique_indices.keys().cloned().collect()
    }

    /// Builds a binary index on `field`.
    ///
    /// A no-op when a clean index exists, unless `force` is set. Dirty
    /// indices are always rebuilt.
    pub fn ensure_index(&mut self, field: &str, force: bool) {
        if !force && self.clean_index(field).is_some() {
            return;
        }
        let index = BinaryIndex::build(field, &self.store);
        debug!(collection = %self.name, field, entries = index.len(), "binary index built");
        self.binary_indices.insert(field.to_string(), index);
        if !self.options.indices.iter().any(|f| f == field) {
            self.options.indices.push(field.to_string());
        }
    }

    /// Rebuilds every binary index that is dirty, or all of them if `force`.
    pub fn ensure_all_indexes(&mut self, force: bool) {
        for field in self.binary_index_fields() {
            self.ensure_index(&field, force);
        }
    }

    /// Adds a unique constraint on `field` over the current documents.
    ///
    /// # Errors
    ///
    /// [`DbError::UniqueViolation`] if two documents already share a value.
    pub fn ensure_unique_index(&mut self, field: &str) -> DbResult<()> {
        let index = UniqueIndex::build(field, &self.store)
            .map_err(|key| self.unique_violation(field, key))?;
        debug!(collection = %self.name, field, keys = index.len(), "unique index built");
        self.unique_indices.insert(field.to_string(), index);
        if !self.options.unique.iter().any(|f| f == field) {
            self.options.unique.push(field.to_string());
        }
        Ok(())
    }

    /// Drops the binary index on `field`. Returns whether one existed.
    pub fn drop_index(&mut self, field: &str) -> bool {
        self.options.indices.retain(|f| f != field);
        self.binary_indices.remove(field).is_some()
    }

    /// Verifies that the binary index on `field` is clean, ordered and
    /// agrees with the stored documents.
    pub fn check_index(&self, field: &str) -> bool {
        self.clean_index(field)
            .is_some_and(|index| index.check(&self.store))
    }

    /// Fields whose binary index fails [`check_index`](Self::check_index).
    pub fn check_all_indexes(&self) -> Vec<String> {
        self.binary_indices
            .keys()
            .filter(|field| !self.check_index(field))
            .cloned()
            .collect()
    }

    pub(crate) fn rebuild_indexes(&mut self) -> DbResult<()> {
        for (field, index) in &mut self.binary_indices {
            *index = BinaryIndex::build(field, &self.store);
        }
        let mut unique = BTreeMap::new();
        for field in self.unique_indices.keys() {
            let index = UniqueIndex::build(field, &self.store)
                .map_err(|key| self.unique_violation(field, key))?;
            unique.insert(field.clone(), index);
        }
        self.unique_indices = unique;
        Ok(())
    }

    /// Registers a named transform.
    ///
    /// # Errors
    ///
    /// [`DbError::TransformExists`] if the name is taken.
    pub fn add_transform(&mut self, name: &str, steps: Vec<TransformStep>) -> DbResult<()> {
        if self.transforms.contains_key(name) {
            return Err(DbError::TransformExists {
                name: name.to_string(),
            });
        }
        self.transforms.insert(name.to_string(), steps);
        Ok(())
    }

    /// Registers or replaces a named transform.
    pub fn set_transform(&mut self, name: &str, steps: Vec<TransformStep>) {
        self.transforms.insert(name.to_string(), steps);
    }

    /// The steps of a named transform.
    pub fn get_transform(&self, name: &str) -> Option<&[TransformStep]> {
        self.transforms.get(name).map(Vec::as_slice)
    }

    /// Removes a named transform.
    ///
    /// # Errors
    ///
    /// [`DbError::TransformNotFound`] if the name is unknown.
    pub fn remove_transform(&mut self, name: &str) -> DbResult<()> {
        self.transforms
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::TransformNotFound {
                name: name.to_string(),
            })
    }

    /// Runs a named transform and returns the resulting cursor.
    ///
    /// # Errors
    ///
    /// [`DbError::TransformNotFound`] for an unknown name, or any error of
    /// [`ResultSet::transform`].
    pub fn chain_transform(
        &self,
        name: &str,
        params: Option<&Value>,
    ) -> DbResult<ResultSet<&Collection>> {
        let steps = self
            .transforms
            .get(name)
            .ok_or_else(|| DbError::TransformNotFound {
                name: name.to_string(),
            })?;
        self.chain().transform(steps, params)
    }

    /// Runs a named transform and returns the documents.
    ///
    /// # Errors
    ///
    /// As for [`chain_transform`](Self::chain_transform).
    pub fn transform(&self, name: &str, params: Option<&Value>) -> DbResult<Vec<Value>> {
        Ok(self.chain_transform(name, params)?.data())
    }

    /// Logged changes not yet flushed.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Returns and clears the change log.
    pub fn flush_changes(&mut self) -> Vec<Change> {
        std::mem::take(&mut self.changes)
    }

    /// Removes every document and resets the identity counter.
    ///
    /// Index and unique configuration is kept unless `remove_indices` is
    /// set. Dynamic views keep their pipelines and are rebuilt empty.
    pub fn clear(&mut self, remove_indices: bool) {
        self.store.clear();
        self.max_id = 0;
        if remove_indices {
            self.binary_indices.clear();
            self.unique_indices.clear();
            self.options.indices.clear();
            self.options.unique.clear();
        } else {
            self.binary_indices.values_mut().for_each(BinaryIndex::clear);
            self.unique_indices.values_mut().for_each(UniqueIndex::clear);
        }
        for view in &mut self.views {
            view.rebuild(&self.store);
        }
        self.dirty = true;
        debug!(collection = %self.name, "collection cleared");
    }

    /// Creates a dynamic view and returns a handle to configure it.
    ///
    /// # Errors
    ///
    /// [`DbError::ViewExists`] if the name is taken.
    pub fn add_dynamic_view(
        &mut self,
        name: &str,
        options: DynamicViewOptions,
    ) -> DbResult<DynamicViewMut<'_>> {
        if self.views.iter().any(|v| v.name() == name) {
            return Err(DbError::ViewExists {
                name: name.to_string(),
            });
        }
        let mut view = DynamicView::new(name, options);
        if options.persistent {
            view.refresh(&self.store);
        }
        self.views.push(view);
        debug!(collection = %self.name, view = name, "dynamic view added");
        let index = self.views.len() - 1;
        Ok(DynamicViewMut::new(self, index))
    }

    /// Read-only access to a view.
    pub fn get_dynamic_view(&self, name: &str) -> Option<DynamicViewRef<'_>> {
        self.views
            .iter()
            .find(|v| v.name() == name)
            .map(|view| DynamicViewRef::new(self, view))
    }

    /// Mutable access to a view.
    pub fn get_dynamic_view_mut(&mut self, name: &str) -> Option<DynamicViewMut<'_>> {
        let index = self.views.iter().position(|v| v.name() == name)?;
        Some(DynamicViewMut::new(self, index))
    }

    /// Removes a view. Returns whether it existed.
    pub fn remove_dynamic_view(&mut self, name: &str) -> bool {
        let before = self.views.len();
        self.views.retain(|v| v.name() != name);
        self.views.len() != before
    }

    /// Names of the collection's views.
    pub fn dynamic_view_names(&self) -> Vec<&str> {
        self.views.iter().map(DynamicView::name).collect()
    }

    pub(crate) fn view_at(&self, index: usize) -> &DynamicView {
        &self.views[index]
    }

    pub(crate) fn view_parts(&mut self, index: usize) -> (&mut DynamicView, &DocStore) {
        (&mut self.views[index], &self.store)
    }

    /// Point-in-time summary.
    pub fn summary(&self) -> CollectionSummary {
        CollectionSummary {
            name: self.name.clone(),
            count: self.len(),
            max_id: self.max_id,
            dirty: self.dirty,
            binary_indices: self.binary_index_fields(),
            unique_fields: self.unique_fields(),
            dynamic_views: self.views.iter().map(|v| v.name().to_string()).collect(),
            inserts: self.stats.inserts(),
            updates: self.stats.updates(),
            removes: self.stats.removes(),
            scans: self.stats.scans(),
            index_lookups: self.stats.index_lookups(),
        }
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("count", &self.store.len())
            .field("max_id", &self.max_id)
            .field("binary_indices", &self.binary_indices.keys().collect::<Vec<_>>())
            .field("unique_indices", &self.unique_indices.keys().collect::<Vec<_>>())
            .field("views", &self.views.len())
            .field("dirty", &self.dirty)
            .field("ttl", &self.ttl_task.is_some())
            .finish()
    }
}
