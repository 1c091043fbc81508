//! Named, reusable query pipelines.

use crate::error::{DbError, DbResult};
use crate::query::{Comparator, Predicate, SortCriterion};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix marking a string inside a `Find` step as a parameter reference.
pub const PARAM_PREFIX: &str = "[%lktxp]";

/// One step of a transform pipeline.
#[derive(Clone)]
pub enum TransformStep {
    /// Narrow with a JSON query. String values of the form
    /// `"[%lktxp]name"` are replaced by parameter `name` at execution time.
    Find(Value),
    /// Narrow with a predicate.
    Where(Predicate),
    /// Sort on one field.
    SimpleSort {
        /// Sort key.
        field: String,
        /// Sort descending.
        descending: bool,
    },
    /// Cascading multi-field sort.
    CompoundSort(Vec<SortCriterion>),
    /// Sort with a custom comparator.
    Sort(Comparator),
    /// Keep at most this many rows.
    Limit(usize),
    /// Skip this many rows.
    Offset(usize),
}

impl fmt::Debug for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find(q) => f.debug_tuple("Find").field(q).finish(),
            Self::Where(_) => f.write_str("Where(..)"),
            Self::SimpleSort { field, descending } => f
                .debug_struct("SimpleSort")
                .field("field", field)
                .field("descending", descending)
                .finish(),
            Self::CompoundSort(c) => f.debug_tuple("CompoundSort").field(c).finish(),
            Self::Sort(_) => f.write_str("Sort(..)"),
            Self::Limit(n) => f.debug_tuple("Limit").field(n).finish(),
            Self::Offset(n) => f.debug_tuple("Offset").field(n).finish(),
        }
    }
}

/// Persistable form of a transform step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub(crate) enum SerializedStep {
    Find { value: Value },
    SimpleSort { property: String, desc: bool },
    CompoundSort { value: Vec<SortCriterion> },
    Limit { value: usize },
    Offset { value: usize },
}

impl TransformStep {
    pub(crate) fn to_serialized(&self) -> Option<SerializedStep> {
        Some(match self {
            Self::Find(value) => SerializedStep::Find {
                value: value.clone(),
            },
            Self::SimpleSort { field, descending } => SerializedStep::SimpleSort {
                property: field.clone(),
                desc: *descending,
            },
            Self::CompoundSort(c) => SerializedStep::CompoundSort { value: c.clone() },
            Self::Limit(n) => SerializedStep::Limit { value: *n },
            Self::Offset(n) => SerializedStep::Offset { value: *n },
            Self::Where(_) | Self::Sort(_) => return None,
        })
    }

    pub(crate) fn from_serialized(step: SerializedStep) -> Self {
        match step {
            SerializedStep::Find { value } => Self::Find(value),
            SerializedStep::SimpleSort { property, desc } => Self::SimpleSort {
                field: property,
                descending: desc,
            },
            SerializedStep::CompoundSort { value } => Self::CompoundSort(value),
            SerializedStep::Limit { value } => Self::Limit(value),
            SerializedStep::Offset { value } => Self::Offset(value),
        }
    }
}

/// Replaces parameter references inside `value`.
///
/// # Errors
///
/// [`DbError::InvalidQuery`] when a referenced parameter is not supplied.
pub(crate) fn substitute(value: &Value, params: Option<&Value>) -> DbResult<Value> {
    Ok(match value {
        Value::String(s) => match s.strip_prefix(PARAM_PREFIX) {
            Some(name) => params
                .and_then(|p| p.get(name))
                .cloned()
                .ok_or_else(|| DbError::invalid_query(format!("missing transform parameter {name}")))?,
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| substitute(v, params))
                .collect::<DbResult<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), substitute(v, params)?)))
                .collect::<DbResult<_>>()?,
        ),
        other => other.clone(),
    })
}
