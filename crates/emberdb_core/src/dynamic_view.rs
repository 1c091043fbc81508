//! Named views over a collection, maintained as the collection mutates.
//!
//! A [`DynamicView`] holds a filter pipeline (query and predicate steps,
//! ANDed), an optional sort specification and a materialized list of
//! document identities.
//!
//! - Persistent views update their result on every insert, update and
//!   remove, placing new members at their sorted position.
//! - Non-persistent views only mark themselves dirty and recompute on the
//!   next read.
//!
//! Views are owned by their collection. Use [`Collection::add_dynamic_view`]
//! and [`Collection::get_dynamic_view_mut`] to obtain a [`DynamicViewMut`]
//! handle for configuring them, or [`Collection::get_dynamic_view`] for a
//! read-only [`DynamicViewRef`].
//!
//! ```rust
//! use emberdb_core::{Collection, CollectionOptions, DynamicViewOptions};
//! use serde_json::json;
//!
//! let mut tasks = Collection::new("tasks", CollectionOptions::default());
//! tasks
//!     .add_dynamic_view("open", DynamicViewOptions::new().persistent(true))
//!     .unwrap()
//!     .apply_find(json!({"done": false}), None)
//!     .unwrap();
//!
//! tasks.insert_one(json!({"title": "write docs", "done": false})).unwrap();
//! assert_eq!(tasks.get_dynamic_view("open").unwrap().count(), 1);
//! ```

use crate::collection::{Collection, DocStore};
use crate::config::DynamicViewOptions;
use crate::document::DocId;
use crate::error::{DbError, DbResult};
use crate::events::{EventFeed, ViewEvent};
use crate::query::{
    compound_comparator, simple_comparator, Comparator, IntoQuery, Predicate, Query,
    SortCriterion,
};
use crate::resultset::ResultSet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{trace, warn};

/// The condition of one pipeline step.
#[derive(Clone)]
pub enum FilterKind {
    /// A compiled query.
    Find(Query),
    /// An arbitrary predicate.
    Where(Predicate),
}

impl fmt::Debug for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find(q) => f.debug_tuple("Find").field(q).finish(),
            Self::Where(_) => f.write_str("Where(..)"),
        }
    }
}

/// One step of a view's filter pipeline.
#[derive(Debug, Clone)]
pub struct ViewFilter {
    /// Caller-chosen identifier used by `remove_filter`.
    pub uid: Option<String>,
    /// The condition.
    pub kind: FilterKind,
}

impl ViewFilter {
    fn matches(&self, doc: &Value) -> bool {
        match &self.kind {
            FilterKind::Find(q) => q.matches(doc),
            FilterKind::Where(p) => p(doc),
        }
    }
}

/// How a view orders its result.
#[derive(Clone)]
pub enum SortSpec {
    /// One field.
    Simple {
        /// Sort key.
        field: String,
        /// Sort descending.
        descending: bool,
    },
    /// Several fields.
    Compound(Vec<SortCriterion>),
    /// Custom comparator.
    Custom(Comparator),
}

impl SortSpec {
    fn comparator(&self) -> Comparator {
        match self {
            Self::Simple { field, descending } => simple_comparator(field.clone(), *descending),
            Self::Compound(criteria) => compound_comparator(criteria),
            Self::Custom(cmp) => Arc::clone(cmp),
        }
    }
}

impl fmt::Debug for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { field, descending } => f
                .debug_struct("Simple")
                .field("field", field)
                .field("descending", descending)
                .finish(),
            Self::Compound(c) => f.debug_tuple("Compound").field(c).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SerializedFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid: Option<String>,
    query: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum SerializedSort {
    Simple { field: String, descending: bool },
    Compound { criteria: Vec<SortCriterion> },
}

/// Persistable form of a dynamic view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedView {
    name: String,
    #[serde(default)]
    options: DynamicViewOptions,
    #[serde(default)]
    filters: Vec<SerializedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort: Option<SerializedSort>,
}

#[derive(Debug, Clone)]
struct Snapshot {
    filters: Vec<ViewFilter>,
    sort: Option<SortSpec>,
}

/// A named filtered and sorted view of a collection.
pub struct DynamicView {
    name: String,
    options: DynamicViewOptions,
    filters: Vec<ViewFilter>,
    sort: Option<SortSpec>,
    comparator: Option<Comparator>,
    result: Vec<DocId>,
    members: HashSet<DocId>,
    result_dirty: bool,
    events: EventFeed<ViewEvent>,
    snapshot: Option<Snapshot>,
}

impl DynamicView {
    pub(crate) fn new(name: impl Into<String>, options: DynamicViewOptions) -> Self {
        Self {
            name: name.into(),
            options,
            filters: Vec::new(),
            sort: None,
            comparator: None,
            result: Vec::new(),
            members: HashSet::new(),
            result_dirty: true,
            events: EventFeed::new(),
            snapshot: None,
        }
    }

    /// View name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// View options.
    pub fn options(&self) -> DynamicViewOptions {
        self.options
    }

    /// Returns true if the result is maintained on every mutation.
    pub fn is_persistent(&self) -> bool {
        self.options.persistent
    }

    /// The filter pipeline.
    pub fn filters(&self) -> &[ViewFilter] {
        &self.filters
    }

    /// The active sort specification.
    pub fn sort_spec(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    /// Returns true if the materialized result is stale.
    pub fn is_dirty(&self) -> bool {
        self.result_dirty
    }

    /// Subscribes to view notifications.
    pub fn subscribe(&self) -> Receiver<ViewEvent> {
        self.events.subscribe()
    }

    /// Tests a document against the whole pipeline.
    pub fn matches(&self, doc: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    fn order(&self, store: &DocStore, a: DocId, b: DocId) -> Ordering {
        match (&self.comparator, store.by_id(a), store.by_id(b)) {
            (Some(cmp), Some(x), Some(y)) => cmp(x, y).then(a.cmp(&b)),
            _ => a.cmp(&b),
        }
    }

    /// Computes the result from scratch without caching it.
    pub(crate) fn compute(&self, store: &DocStore) -> Vec<DocId> {
        let mut ids: Vec<DocId> = store
            .iter()
            .filter(|(_, doc)| self.matches(doc))
            .map(|(id, _)| id)
            .collect();
        if self.comparator.is_some() {
            ids.sort_by(|&a, &b| self.order(store, a, b));
        }
        ids
    }

    fn recompute(&mut self, store: &DocStore) {
        self.result = self.compute(store);
        self.members = self.result.iter().copied().collect();
        self.result_dirty = false;
    }

    pub(crate) fn refresh(&mut self, store: &DocStore) {
        if self.result_dirty {
            self.recompute(store);
        }
    }

    /// Pipeline or sort changed: persistent views recompute now.
    fn invalidate(&mut self, store: &DocStore) {
        if self.options.persistent {
            self.recompute(store);
        } else {
            self.result_dirty = true;
        }
    }

    pub(crate) fn rebuild(&mut self, store: &DocStore) {
        self.recompute(store);
        trace!(view = %self.name, count = self.result.len(), "dynamic view rebuilt");
        self.events.emit(ViewEvent::Rebuild {
            count: self.result.len(),
        });
    }

    pub(crate) fn ids(&self, store: &DocStore) -> Cow<'_, [DocId]> {
        if self.result_dirty {
            Cow::Owned(self.compute(store))
        } else {
            Cow::Borrowed(&self.result)
        }
    }

    pub(crate) fn push_filter(&mut self, filter: ViewFilter, store: &DocStore) {
        if let Some(uid) = &filter.uid {
            self.filters.retain(|f| f.uid.as_ref() != Some(uid));
        }
        self.filters.push(filter);
        self.invalidate(store);
        self.events.emit(ViewEvent::FilterApplied);
    }

    pub(crate) fn remove_filter(&mut self, uid: &str, store: &DocStore) -> DbResult<()> {
        let before = self.filters.len();
        self.filters.retain(|f| f.uid.as_deref() != Some(uid));
        if self.filters.len() == before {
            return Err(DbError::FilterNotFound {
                view: self.name.clone(),
                uid: uid.to_string(),
            });
        }
        self.invalidate(store);
        self.events.emit(ViewEvent::FilterApplied);
        Ok(())
    }

    pub(crate) fn clear_filters(&mut self, store: &DocStore) {
        self.filters.clear();
        self.invalidate(store);
        self.events.emit(ViewEvent::FilterApplied);
    }

    pub(crate) fn set_sort(&mut self, sort: Option<SortSpec>, store: &DocStore) {
        self.comparator = sort.as_ref().map(SortSpec::comparator);
        self.sort = sort;
        if self.options.persistent && !self.result_dirty {
            let mut result = std::mem::take(&mut self.result);
            result.sort_by(|&a, &b| self.order(store, a, b));
            self.result = result;
        } else {
            self.result_dirty = true;
        }
        self.events.emit(ViewEvent::SortApplied);
    }

    fn insert_sorted(&mut self, id: DocId, store: &DocStore) {
        let at = self
            .result
            .partition_point(|&other| self.order(store, other, id) == Ordering::Less);
        self.result.insert(at, id);
        self.members.insert(id);
    }

    fn drop_member(&mut self, id: DocId) {
        if self.members.remove(&id) {
            if let Some(at) = self.result.iter().position(|&r| r == id) {
                self.result.remove(at);
            }
        }
    }

    pub(crate) fn on_insert(&mut self, id: DocId, doc: &Value, store: &DocStore) {
        if !self.options.persistent || self.result_dirty {
            self.result_dirty = true;
            return;
        }
        if self.matches(doc) {
            self.insert_sorted(id, store);
        }
    }

    pub(crate) fn on_update(&mut self, id: DocId, doc: &Value, store: &DocStore) {
        if !self.options.persistent || self.result_dirty {
            self.result_dirty = true;
            return;
        }
        let was = self.members.contains(&id);
        let now = self.matches(doc);
        match (was, now) {
            (false, true) => self.insert_sorted(id, store),
            (true, false) => self.drop_member(id),
            (true, true) if self.comparator.is_some() => {
                self.drop_member(id);
                self.insert_sorted(id, store);
            }
            _ => {}
        }
    }

    pub(crate) fn on_remove(&mut self, id: DocId) {
        if !self.options.persistent || self.result_dirty {
            self.result_dirty = true;
            return;
        }
        self.drop_member(id);
    }

    pub(crate) fn start_transaction(&mut self) {
        self.snapshot = Some(Snapshot {
            filters: self.filters.clone(),
            sort: self.sort.clone(),
        });
    }

    pub(crate) fn commit(&mut self) {
        self.snapshot = None;
    }

    pub(crate) fn rollback(&mut self, store: &DocStore) {
        if let Some(snapshot) = self.snapshot.take() {
            self.filters = snapshot.filters;
            self.comparator = snapshot.sort.as_ref().map(SortSpec::comparator);
            self.sort = snapshot.sort;
            self.invalidate(store);
        }
    }

    pub(crate) fn to_serialized(&self) -> SerializedView {
        let mut filters = Vec::with_capacity(self.filters.len());
        for filter in &self.filters {
            match &filter.kind {
                FilterKind::Find(q) => filters.push(SerializedFilter {
                    uid: filter.uid.clone(),
                    query: q.to_value(),
                }),
                FilterKind::Where(_) => {
                    warn!(view = %self.name, uid = ?filter.uid, "dropping predicate filter from serialized view");
                }
            }
        }
        let sort = match &self.sort {
            Some(SortSpec::Simple { field, descending }) => Some(SerializedSort::Simple {
                field: field.clone(),
                descending: *descending,
            }),
            Some(SortSpec::Compound(criteria)) => Some(SerializedSort::Compound {
                criteria: criteria.clone(),
            }),
            Some(SortSpec::Custom(_)) => {
                warn!(view = %self.name, "dropping custom comparator from serialized view");
                None
            }
            None => None,
        };
        SerializedView {
            name: self.name.clone(),
            options: self.options,
            filters,
            sort,
        }
    }

    pub(crate) fn from_serialized(view: SerializedView, store: &DocStore) -> DbResult<Self> {
        let mut restored = Self::new(view.name, view.options);
        for filter in view.filters {
            restored.filters.push(ViewFilter {
                uid: filter.uid,
                kind: FilterKind::Find(Query::parse(&filter.query)?),
            });
        }
        let sort = view.sort.map(|s| match s {
            SerializedSort::Simple { field, descending } => SortSpec::Simple { field, descending },
            SerializedSort::Compound { criteria } => SortSpec::Compound(criteria),
        });
        restored.comparator = sort.as_ref().map(SortSpec::comparator);
        restored.sort = sort;
        restored.recompute(store);
        Ok(restored)
    }
}

impl fmt::Debug for DynamicView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicView")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("filters", &self.filters)
            .field("sort", &self.sort)
            .field("count", &self.result.len())
            .field("dirty", &self.result_dirty)
            .finish()
    }
}

fn positions(store: &DocStore, ids: &[DocId]) -> Vec<usize> {
    ids.iter().filter_map(|&id| store.position(id)).collect()
}

/// Read-only handle to a view.
#[derive(Debug, Clone, Copy)]
pub struct DynamicViewRef<'a> {
    collection: &'a Collection,
    view: &'a DynamicView,
}

impl<'a> DynamicViewRef<'a> {
    pub(crate) fn new(collection: &'a Collection, view: &'a DynamicView) -> Self {
        Self { collection, view }
    }

    /// The underlying view.
    pub fn view(&self) -> &'a DynamicView {
        self.view
    }

    /// View name.
    pub fn name(&self) -> &'a str {
        self.view.name()
    }

    /// Identities in view order, recomputed on the fly when stale.
    pub fn ids(&self) -> Vec<DocId> {
        self.view.ids(self.collection.store()).into_owned()
    }

    /// Number of documents in the view.
    pub fn count(&self) -> usize {
        self.view.ids(self.collection.store()).len()
    }

    /// Clones the documents in view order.
    pub fn data(&self) -> Vec<Value> {
        let store = self.collection.store();
        self.view
            .ids(store)
            .iter()
            .filter_map(|&id| store.by_id(id).cloned())
            .collect()
    }

    /// A fresh cursor seeded with the view's rows.
    pub fn branch_resultset(&self) -> ResultSet<&'a Collection> {
        let store = self.collection.store();
        ResultSet::with_rows(self.collection, positions(store, &self.view.ids(store)))
    }
}

/// Mutable handle to a view, borrowed from its collection.
#[derive(Debug)]
pub struct DynamicViewMut<'a> {
    collection: &'a mut Collection,
    index: usize,
}

impl<'a> DynamicViewMut<'a> {
    pub(crate) fn new(collection: &'a mut Collection, index: usize) -> Self {
        Self { collection, index }
    }

    fn parts(&mut self) -> (&mut DynamicView, &DocStore) {
        self.collection.view_parts(self.index)
    }

    /// The underlying view.
    pub fn view(&self) -> &DynamicView {
        self.collection.view_at(self.index)
    }

    /// View name.
    pub fn name(&self) -> &str {
        self.view().name()
    }

    /// Appends a query step, replacing any step with the same `uid`.
    ///
    /// # Errors
    ///
    /// Fails if the query is malformed.
    pub fn apply_find(&mut self, query: impl IntoQuery, uid: Option<&str>) -> DbResult<&mut Self> {
        let filter = ViewFilter {
            uid: uid.map(str::to_string),
            kind: FilterKind::Find(query.into_query()?),
        };
        let (view, store) = self.parts();
        view.push_filter(filter, store);
        Ok(self)
    }

    /// Appends a predicate step, replacing any step with the same `uid`.
    pub fn apply_where<F>(&mut self, predicate: F, uid: Option<&str>) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let filter = ViewFilter {
            uid: uid.map(str::to_string),
            kind: FilterKind::Where(Arc::new(predicate)),
        };
        let (view, store) = self.parts();
        view.push_filter(filter, store);
        self
    }

    /// Removes the step tagged `uid`.
    ///
    /// # Errors
    ///
    /// [`DbError::FilterNotFound`] if no step carries that uid.
    pub fn remove_filter(&mut self, uid: &str) -> DbResult<&mut Self> {
        let (view, store) = self.parts();
        view.remove_filter(uid, store)?;
        Ok(self)
    }

    /// Removes every pipeline step.
    pub fn remove_filters(&mut self) -> &mut Self {
        let (view, store) = self.parts();
        view.clear_filters(store);
        self
    }

    /// Sorts the view on one field.
    pub fn apply_simple_sort(&mut self, field: &str, descending: bool) -> &mut Self {
        self.set_sort(Some(SortSpec::Simple {
            field: field.to_string(),
            descending,
        }))
    }

    /// Sorts the view on several fields.
    pub fn apply_sort_criteria(&mut self, criteria: Vec<SortCriterion>) -> &mut Self {
        self.set_sort(Some(SortSpec::Compound(criteria)))
    }

    /// Sorts the view with a custom comparator.
    pub fn apply_sort<F>(&mut self, cmp: F) -> &mut Self
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.set_sort(Some(SortSpec::Custom(Arc::new(cmp))))
    }

    /// Clears the sort specification.
    pub fn remove_sort(&mut self) -> &mut Self {
        self.set_sort(None)
    }

    fn set_sort(&mut self, sort: Option<SortSpec>) -> &mut Self {
        let (view, store) = self.parts();
        view.set_sort(sort, store);
        self
    }

    /// Recomputes the result from scratch and notifies subscribers.
    pub fn rebuild(&mut self) -> &mut Self {
        let (view, store) = self.parts();
        view.rebuild(store);
        self
    }

    /// Identities in view order.
    pub fn ids(&mut self) -> Vec<DocId> {
        let (view, store) = self.parts();
        view.refresh(store);
        view.result.clone()
    }

    /// Number of documents in the view.
    pub fn count(&mut self) -> usize {
        let (view, store) = self.parts();
        view.refresh(store);
        view.result.len()
    }

    /// Clones the documents in view order.
    pub fn data(&mut self) -> Vec<Value> {
        let (view, store) = self.parts();
        view.refresh(store);
        view.result
            .iter()
            .filter_map(|&id| store.by_id(id).cloned())
            .collect()
    }

    /// A fresh cursor seeded with the view's rows.
    pub fn branch_resultset(&mut self) -> ResultSet<&Collection> {
        let (view, store) = self.parts();
        view.refresh(store);
        let rows = positions(store, &view.result);
        ResultSet::with_rows(&*self.collection, rows)
    }

    /// Snapshots the pipeline and sort for a later rollback.
    pub fn start_transaction(&mut self) -> &mut Self {
        self.parts().0.start_transaction();
        self
    }

    /// Discards the snapshot.
    pub fn commit(&mut self) -> &mut Self {
        self.parts().0.commit();
        self
    }

    /// Restores the snapshot taken by `start_transaction`.
    pub fn rollback(&mut self) -> &mut Self {
        let (view, store) = self.parts();
        view.rollback(store);
        self
    }

    /// Subscribes to view notifications.
    pub fn subscribe(&self) -> Receiver<ViewEvent> {
        self.view().subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionOptions;
    use serde_json::json;

    fn collection() -> Collection {
        Collection::new("items", CollectionOptions::default())
    }

    #[test]
    fn active_flag_scenario() {
        let mut c = collection();
        c.add_dynamic_view("active", DynamicViewOptions::new().persistent(true))
            .unwrap()
            .apply_find(json!({"active": true}), None)
            .unwrap();
        assert_eq!(c.get_dynamic_view("active").unwrap().count(), 0);

        let doc = c.insert_one(json!({"name": "x", "active": true})).unwrap();
        assert_eq!(c.get_dynamic_view("active").unwrap().count(), 1);

        let mut changed = doc.clone();
        changed["active"] = json!(false);
        c.update_one(changed).unwrap();
        assert_eq!(c.get_dynamic_view("active").unwrap().count(), 0);
    }

    #[test]
    fn persistent_view_keeps_sorted_order() {
        let mut c = collection();
        c.add_dynamic_view("by_score", DynamicViewOptions::new().persistent(true))
            .unwrap()
            .apply_simple_sort("score", true);
        for score in [5, 9, 1, 7] {
            c.insert_one(json!({"score": score})).unwrap();
        }
        let scores = |c: &Collection| -> Vec<i64> {
            c.get_dynamic_view("by_score")
                .unwrap()
                .data()
                .iter()
                .map(|d| d["score"].as_i64().unwrap())
                .collect()
        };
        assert_eq!(scores(&c), vec![9, 7, 5, 1]);

        let mut low = c.get(3).unwrap().clone();
        low["score"] = json!(8);
        c.update_one(low).unwrap();
        assert_eq!(scores(&c), vec![9, 8, 7, 5]);

        c.remove_by_id(2).unwrap();
        assert_eq!(scores(&c), vec![8, 7, 5]);
    }

    #[test]
    fn non_persistent_view_recomputes_lazily() {
        let mut c = collection();
        c.add_dynamic_view("big", DynamicViewOptions::default())
            .unwrap()
            .apply_find(json!({"n": {"$gte": 10}}), None)
            .unwrap();
        c.insert(vec![json!({"n": 1}), json!({"n": 10}), json!({"n": 20})])
            .unwrap();
        assert!(c.get_dynamic_view("big").unwrap().view().is_dirty());
        assert_eq!(c.get_dynamic_view("big").unwrap().count(), 2);

        let mut view = c.get_dynamic_view_mut("big").unwrap();
        assert_eq!(view.count(), 2);
        assert!(!view.view().is_dirty());
    }

    #[test]
    fn filters_can_be_tagged_and_removed() {
        let mut c = collection();
        c.insert(vec![json!({"a": 1, "b": 1}), json!({"a": 1, "b": 2})])
            .unwrap();
        let mut view = c
            .add_dynamic_view("v", DynamicViewOptions::new().persistent(true))
            .unwrap();
        view.apply_find(json!({"a": 1}), Some("a")).unwrap();
        view.apply_where(|d| d["b"] == json!(2), Some("b"));
        assert_eq!(view.count(), 1);

        view.remove_filter("b").unwrap();
        assert_eq!(view.count(), 2);
        assert!(matches!(
            view.remove_filter("b"),
            Err(DbError::FilterNotFound { .. })
        ));
    }

    #[test]
    fn same_uid_replaces_step() {
        let mut c = collection();
        c.insert(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();
        let mut view = c.add_dynamic_view("v", DynamicViewOptions::default()).unwrap();
        view.apply_find(json!({"a": 1}), Some("f")).unwrap();
        view.apply_find(json!({"a": 2}), Some("f")).unwrap();
        assert_eq!(view.view().filters().len(), 1);
        assert_eq!(view.data()[0]["a"], 2);
    }

    #[test]
    fn sort_kinds_replace_each_other() {
        let mut c = collection();
        c.insert(vec![json!({"a": 2, "b": 1}), json!({"a": 1, "b": 2})])
            .unwrap();
        let mut view = c.add_dynamic_view("v", DynamicViewOptions::default()).unwrap();
        view.apply_simple_sort("a", false);
        assert_eq!(view.data()[0]["a"], 1);
        view.apply_sort(|x, y| y["b"].as_i64().cmp(&x["b"].as_i64()));
        assert!(matches!(view.view().sort_spec(), Some(SortSpec::Custom(_))));
        assert_eq!(view.data()[0]["b"], 2);
        view.remove_sort();
        assert_eq!(view.ids(), vec![1, 2]);
    }

    #[test]
    fn branch_resultset_is_independent() {
        let mut c = collection();
        c.insert(vec![json!({"k": "a"}), json!({"k": "b"}), json!({"k": "a"})])
            .unwrap();
        c.add_dynamic_view("as", DynamicViewOptions::new().persistent(true))
            .unwrap()
            .apply_find(json!({"k": "a"}), None)
            .unwrap();

        let view = c.get_dynamic_view("as").unwrap();
        let narrowed = view.branch_resultset().limit(1);
        assert_eq!(narrowed.count(), 1);
        assert_eq!(view.count(), 2);
    }

    #[test]
    fn transactions_roll_back_pipeline() {
        let mut c = collection();
        c.insert(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();
        let mut view = c
            .add_dynamic_view("v", DynamicViewOptions::new().persistent(true))
            .unwrap();
        view.start_transaction();
        view.apply_find(json!({"a": 1}), None).unwrap();
        assert_eq!(view.count(), 1);
        view.rollback();
        assert_eq!(view.count(), 2);
        assert!(view.view().filters().is_empty());
    }

    #[test]
    fn events_are_emitted() {
        let mut c = collection();
        let mut view = c.add_dynamic_view("v", DynamicViewOptions::default()).unwrap();
        let rx = view.subscribe();
        view.apply_find(json!({"a": 1}), None).unwrap();
        view.apply_simple_sort("a", false);
        view.rebuild();
        assert_eq!(rx.try_recv().unwrap(), ViewEvent::FilterApplied);
        assert_eq!(rx.try_recv().unwrap(), ViewEvent::SortApplied);
        assert_eq!(rx.try_recv().unwrap(), ViewEvent::Rebuild { count: 0 });
    }

    #[test]
    fn serialization_drops_predicates() {
        let mut c = collection();
        c.insert(vec![json!({"a": 1}), json!({"a": 2})]).unwrap();
        let mut view = c.add_dynamic_view("v", DynamicViewOptions::default()).unwrap();
        view.apply_find(json!({"a": {"$gte": 1}}), Some("q")).unwrap();
        view.apply_where(|_| false, None);
        view.apply_simple_sort("a", true);

        let serialized = view.view().to_serialized();
        assert_eq!(serialized.filters.len(), 1);
        let restored = DynamicView::from_serialized(serialized, c.store()).unwrap();
        assert_eq!(restored.ids(c.store()).into_owned(), vec![2, 1]);
    }
}
