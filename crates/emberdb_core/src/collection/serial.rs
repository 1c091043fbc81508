//! Structural snapshots of a collection.

use super::transform::{SerializedStep, TransformStep};
use super::{Collection, DocStore};
use crate::config::CollectionOptions;
use crate::document::{doc_id, DocId};
use crate::dynamic_view::{DynamicView, SerializedView};
use crate::error::{DbError, DbResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Persistable form of a [`Collection`].
///
/// Indices are stored as field lists and rebuilt from the documents on
/// restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCollection {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) data: Vec<Value>,
    #[serde(default)]
    pub(crate) max_id: DocId,
    #[serde(default)]
    pub(crate) binary_indices: Vec<String>,
    #[serde(default)]
    pub(crate) unique_names: Vec<String>,
    #[serde(default)]
    pub(crate) options: CollectionOptions,
    #[serde(default)]
    pub(crate) transforms: BTreeMap<String, Vec<SerializedStep>>,
    #[serde(default)]
    pub(crate) dynamic_views: Vec<SerializedView>,
}

impl SerializedCollection {
    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The serialized documents.
    pub fn documents(&self) -> &[Value] {
        &self.data
    }

    /// Highest identity handed out.
    pub fn max_id(&self) -> DocId {
        self.max_id
    }
}

impl Collection {
    /// Captures the documents and the index, transform and view definitions.
    ///
    /// Predicate and custom comparator steps cannot be serialized and are
    /// left out with a warning.
    pub fn serialize(&self) -> SerializedCollection {
        let mut transforms = BTreeMap::new();
        for (name, steps) in &self.transforms {
            let serialized: Vec<SerializedStep> =
                steps.iter().filter_map(TransformStep::to_serialized).collect();
            if serialized.len() != steps.len() {
                warn!(collection = %self.name, transform = %name, "dropping non-serializable transform steps");
            }
            transforms.insert(name.clone(), serialized);
        }
        SerializedCollection {
            name: self.name.clone(),
            data: self.store.docs().to_vec(),
            max_id: self.max_id,
            binary_indices: self.binary_index_fields(),
            unique_names: self.unique_fields(),
            options: self.options.clone(),
            transforms,
            dynamic_views: self.views.iter().map(DynamicView::to_serialized).collect(),
        }
    }

    /// Rebuilds a collection from a snapshot.
    ///
    /// The restored collection is clean and has no TTL sweep running.
    ///
    /// # Errors
    ///
    /// - [`DbError::InvalidFormat`] if a document lacks a usable `$id` or two share one
    /// - [`DbError::UniqueViolation`] if the documents break a unique constraint
    /// - query errors from a malformed view filter
    pub fn deserialize(snapshot: SerializedCollection) -> DbResult<Self> {
        let SerializedCollection {
            name,
            data,
            max_id,
            binary_indices,
            unique_names,
            mut options,
            transforms,
            dynamic_views,
        } = snapshot;
        options.indices = binary_indices;
        options.unique = unique_names;

        let entries = data
            .into_iter()
            .map(|doc| match doc_id(&doc) {
                Some(id) if doc.is_object() => Ok((id, doc)),
                _ => Err(DbError::invalid_format(format!(
                    "document without a valid $id in collection {name}"
                ))),
            })
            .collect::<DbResult<Vec<_>>>()?;
        let store = DocStore::from_documents(entries);
        if let Some(pair) = store.ids().windows(2).find(|w| w[0] == w[1]) {
            return Err(DbError::invalid_format(format!(
                "duplicate $id {} in collection {name}",
                pair[0]
            )));
        }

        let mut collection = Collection::new(name, options);
        collection.max_id = store.ids().last().copied().unwrap_or(0).max(max_id);
        collection.store = store;
        collection.rebuild_indexes()?;
        collection.transforms = transforms
            .into_iter()
            .map(|(name, steps)| {
                let steps = steps.into_iter().map(TransformStep::from_serialized).collect();
                (name, steps)
            })
            .collect();
        for view in dynamic_views {
            let view = DynamicView::from_serialized(view, &collection.store)?;
            collection.views.push(view);
        }
        Ok(collection)
    }
}
