//! Lazy, chainable cursors over a collection.
//!
//! A [`ResultSet`] starts uninitialized, which stands for every document in
//! the collection. The first filter or sort materializes a list of row
//! positions that later steps narrow or reorder. Every step consumes and
//! returns the cursor so calls chain:
//!
//! ```rust
//! use emberdb_core::{Collection, CollectionOptions};
//! use serde_json::json;
//!
//! let mut users = Collection::new("users", CollectionOptions::default());
//! users.insert(vec![
//!     json!({"name": "alice", "age": 31}),
//!     json!({"name": "bob", "age": 25}),
//!     json!({"name": "carol", "age": 47}),
//! ]).unwrap();
//!
//! let names: Vec<String> = users
//!     .chain()
//!     .find(json!({"age": {"$gt": 30}})).unwrap()
//!     .simplesort("age", true)
//!     .map(|d| d["name"].as_str().unwrap_or_default().to_string());
//! assert_eq!(names, vec!["carol", "alice"]);
//! ```
//!
//! Cursors borrowing the collection mutably (`Collection::chain_mut`) can
//! also update or remove the documents they select.

use crate::collection::{canonical_key, substitute, Collection, TransformStep};
use crate::document::{strip_meta, DocId, ID_FIELD};
use crate::error::{DbError, DbResult};
use crate::query::{compare_field, compound_comparator, resolve_path, IntoQuery, Query, SortCriterion};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

/// Options for [`ResultSet::data_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataOptions {
    /// Drop the `meta` field from returned documents.
    pub remove_meta: bool,
}

/// Right-hand side of an [`eq_join`](ResultSet::eq_join).
#[derive(Debug, Clone, Copy)]
pub enum JoinSource<'a> {
    /// Every document of another collection.
    Collection(&'a Collection),
    /// A plain slice of documents.
    Documents(&'a [Value]),
}

/// A cursor over the rows of one collection.
#[derive(Debug)]
pub struct ResultSet<C> {
    collection: C,
    rows: Vec<usize>,
    initialized: bool,
}

impl<C: Deref<Target = Collection>> ResultSet<C> {
    pub(crate) fn new(collection: C) -> Self {
        Self {
            collection,
            rows: Vec::new(),
            initialized: false,
        }
    }

    pub(crate) fn with_rows(collection: C, rows: Vec<usize>) -> Self {
        Self {
            collection,
            rows,
            initialized: true,
        }
    }

    /// The collection this cursor reads from.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Returns true once a filter or sort has materialized the row list.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn ensure_initialized(&mut self) {
        if !self.initialized {
            self.rows = (0..self.collection.len()).collect();
            self.initialized = true;
        }
    }

    /// Narrows the rows to those matching `query`.
    ///
    /// On an uninitialized cursor a single-condition query on a field with a
    /// clean binary index is answered by binary search; every candidate is
    /// still confirmed with the full matcher.
    ///
    /// # Errors
    ///
    /// Fails if `query` is a malformed JSON query.
    pub fn find(mut self, query: impl IntoQuery) -> DbResult<Self> {
        let query = query.into_query()?;
        self.apply_query(&query);
        Ok(self)
    }

    /// Narrows to rows matching any of `queries`.
    ///
    /// # Errors
    ///
    /// Fails if any query is malformed.
    pub fn find_or<Q: IntoQuery>(self, queries: impl IntoIterator<Item = Q>) -> DbResult<Self> {
        let compiled = queries
            .into_iter()
            .map(IntoQuery::into_query)
            .collect::<DbResult<Vec<_>>>()?;
        self.find(Query::Or(compiled))
    }

    /// Narrows to rows matching all of `queries`.
    ///
    /// # Errors
    ///
    /// Fails if any query is malformed.
    pub fn find_and<Q: IntoQuery>(self, queries: impl IntoIterator<Item = Q>) -> DbResult<Self> {
        let compiled = queries
            .into_iter()
            .map(IntoQuery::into_query)
            .collect::<DbResult<Vec<_>>>()?;
        self.find(Query::And(compiled))
    }

    fn apply_query(&mut self, query: &Query) {
        let collection = &*self.collection;
        let store = collection.store();
        if self.initialized {
            self.rows.retain(|&pos| query.matches(store.get(pos)));
            return;
        }
        if query.is_all() {
            return;
        }
        match collection.index_candidates(query) {
            Some(candidates) => {
                collection.stats().record_index_lookup();
                let mut rows: Vec<usize> = candidates
                    .into_iter()
                    .filter_map(|id| store.position(id))
                    .collect();
                rows.sort_unstable();
                rows.retain(|&pos| query.matches(store.get(pos)));
                self.rows = rows;
            }
            None => {
                collection.stats().record_scan();
                self.rows = (0..store.len())
                    .filter(|&pos| query.matches(store.get(pos)))
                    .collect();
            }
        }
        self.initialized = true;
    }

    /// Narrows the rows with an arbitrary predicate.
    pub fn filter(mut self, predicate: impl Fn(&Value) -> bool) -> Self {
        self.ensure_initialized();
        let store = self.collection.store();
        self.rows.retain(|&pos| predicate(store.get(pos)));
        self
    }

    /// Sorts on one field. Null and absent values sort last.
    pub fn simplesort(mut self, field: &str, descending: bool) -> Self {
        if !self.initialized && !descending {
            if let Some(index) = self.collection.clean_index(field) {
                let store = self.collection.store();
                self.rows = index
                    .ordered_ids()
                    .filter_map(|id| store.position(id))
                    .collect();
                self.initialized = true;
                return self;
            }
        }
        self.sort_rows(|a, b| compare_field(a, b, field, descending));
        self
    }

    /// Sorts on several fields, each ascending or descending.
    pub fn compoundsort(mut self, criteria: &[SortCriterion]) -> Self {
        let cmp = compound_comparator(criteria);
        self.sort_rows(|a, b| cmp(a, b));
        self
    }

    /// Sorts with a custom comparator.
    pub fn sort(mut self, cmp: impl Fn(&Value, &Value) -> Ordering) -> Self {
        self.sort_rows(cmp);
        self
    }

    fn sort_rows(&mut self, cmp: impl Fn(&Value, &Value) -> Ordering) {
        self.ensure_initialized();
        let store = self.collection.store();
        self.rows.sort_by(|&a, &b| cmp(store.get(a), store.get(b)));
    }

    /// Keeps at most `n` rows.
    pub fn limit(mut self, n: usize) -> Self {
        self.ensure_initialized();
        self.rows.truncate(n);
        self
    }

    /// Skips the first `n` rows.
    pub fn offset(mut self, n: usize) -> Self {
        self.ensure_initialized();
        let n = n.min(self.rows.len());
        self.rows.drain(..n);
        self
    }

    /// Runs a transform pipeline, substituting `params` into `Find` steps.
    ///
    /// # Errors
    ///
    /// Fails on a missing parameter or a malformed query.
    pub fn transform(mut self, steps: &[TransformStep], params: Option<&Value>) -> DbResult<Self> {
        for step in steps {
            self = match step {
                TransformStep::Find(raw) => self.find(substitute(raw, params)?)?,
                TransformStep::Where(predicate) => self.filter(|doc| predicate(doc)),
                TransformStep::SimpleSort { field, descending } => {
                    self.simplesort(field, *descending)
                }
                TransformStep::CompoundSort(criteria) => self.compoundsort(criteria),
                TransformStep::Sort(cmp) => self.sort(|a, b| cmp(a, b)),
                TransformStep::Limit(n) => self.limit(*n),
                TransformStep::Offset(n) => self.offset(*n),
            };
        }
        Ok(self)
    }

    /// Returns the cursor to its uninitialized state.
    pub fn reset(mut self) -> Self {
        self.rows.clear();
        self.initialized = false;
        self
    }

    /// Current row positions.
    pub fn rows(&self) -> Vec<usize> {
        if self.initialized {
            self.rows.clone()
        } else {
            (0..self.collection.len()).collect()
        }
    }

    /// Identities of the selected documents, in cursor order.
    pub fn ids(&self) -> Vec<DocId> {
        let store = self.collection.store();
        if self.initialized {
            self.rows.iter().map(|&pos| store.id_at(pos)).collect()
        } else {
            store.ids().to_vec()
        }
    }

    /// Number of selected documents, without materializing them.
    pub fn count(&self) -> usize {
        if self.initialized {
            self.rows.len()
        } else {
            self.collection.len()
        }
    }

    /// Borrows the selected documents.
    pub fn data_refs(&self) -> Vec<&Value> {
        let store = self.collection.store();
        if self.initialized {
            self.rows.iter().map(|&pos| store.get(pos)).collect()
        } else {
            store.docs().iter().collect()
        }
    }

    /// Clones the selected documents.
    pub fn data(&self) -> Vec<Value> {
        self.data_refs().into_iter().cloned().collect()
    }

    /// Clones the selected documents with options applied.
    pub fn data_with(&self, options: DataOptions) -> Vec<Value> {
        let refs = self.data_refs().into_iter();
        if options.remove_meta {
            refs.map(strip_meta).collect()
        } else {
            refs.cloned().collect()
        }
    }

    /// Deserializes the selected documents into `T`.
    ///
    /// # Errors
    ///
    /// Fails if a document does not deserialize into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> DbResult<Vec<T>> {
        self.data_refs()
            .into_iter()
            .map(|doc| serde_json::from_value(doc.clone()).map_err(DbError::from))
            .collect()
    }

    /// Maps each selected document.
    pub fn map<T>(&self, f: impl FnMut(&Value) -> T) -> Vec<T> {
        self.data_refs().into_iter().map(f).collect()
    }

    /// Folds the selected documents.
    pub fn reduce<A>(&self, init: A, mut f: impl FnMut(A, &Value) -> A) -> A {
        self.data_refs().into_iter().fold(init, |acc, doc| f(acc, doc))
    }

    /// First selected document.
    pub fn first(&self) -> Option<&Value> {
        let store = self.collection.store();
        if self.initialized {
            self.rows.first().map(|&pos| store.get(pos))
        } else {
            store.docs().first()
        }
    }

    /// Last selected document.
    pub fn last(&self) -> Option<&Value> {
        let store = self.collection.store();
        if self.initialized {
            self.rows.last().map(|&pos| store.get(pos))
        } else {
            store.docs().last()
        }
    }

    /// An independent read cursor with the same state.
    pub fn branch(&self) -> ResultSet<&Collection> {
        ResultSet {
            collection: &*self.collection,
            rows: self.rows.clone(),
            initialized: self.initialized,
        }
    }

    /// Alias of [`branch`](Self::branch).
    pub fn copy(&self) -> ResultSet<&Collection> {
        self.branch()
    }

    /// Left-outer equality join producing `{"left": .., "right": ..}` pairs.
    pub fn eq_join(&self, source: JoinSource<'_>, left_key: &str, right_key: &str) -> Vec<Value> {
        self.eq_join_with(source, left_key, right_key, |left, right| {
            let mut pair = Map::new();
            pair.insert("left".into(), left.clone());
            pair.insert("right".into(), right.cloned().unwrap_or(Value::Null));
            Value::Object(pair)
        })
    }

    /// Left-outer equality join with a custom output mapping.
    ///
    /// The right side is hashed on `right_key`; when several right documents
    /// share a key the last one wins.
    pub fn eq_join_with<F>(
        &self,
        source: JoinSource<'_>,
        left_key: &str,
        right_key: &str,
        mut map: F,
    ) -> Vec<Value>
    where
        F: FnMut(&Value, Option<&Value>) -> Value,
    {
        let right: &[Value] = match source {
            JoinSource::Collection(c) => c.store().docs(),
            JoinSource::Documents(docs) => docs,
        };
        let lookup: HashMap<String, &Value> = right
            .iter()
            .filter_map(|doc| canonical_key(resolve_path(doc, right_key)).map(|k| (k, doc)))
            .collect();

        self.data_refs()
            .into_iter()
            .map(|left| {
                let matched = canonical_key(resolve_path(left, left_key))
                    .and_then(|k| lookup.get(&k).copied());
                map(left, matched)
            })
            .collect()
    }
}

impl<C: DerefMut<Target = Collection>> ResultSet<C> {
    /// Applies `f` to every selected document and writes it back through
    /// the collection, keeping indices and views current.
    ///
    /// # Errors
    ///
    /// Stops at the first document whose update fails, for example on a
    /// unique constraint violation. Earlier documents stay updated.
    pub fn update(mut self, mut f: impl FnMut(&mut Value)) -> DbResult<Self> {
        let ids = self.ids();
        let collection = &mut *self.collection;
        for id in ids {
            let Some(current) = collection.get(id) else {
                continue;
            };
            let mut doc = current.clone();
            f(&mut doc);
            let map = doc
                .as_object_mut()
                .ok_or_else(|| DbError::invalid_document("update must leave an object"))?;
            map.insert(ID_FIELD.to_string(), Value::from(id));
            collection.update_one(doc)?;
        }
        Ok(self)
    }

    /// Removes every selected document, leaving the cursor empty.
    ///
    /// # Errors
    ///
    /// Propagates collection errors; nothing is removed on failure.
    pub fn remove(mut self) -> DbResult<Self> {
        let ids = self.ids();
        self.collection.remove(&ids)?;
        self.rows.clear();
        self.initialized = true;
        Ok(self)
    }
}
