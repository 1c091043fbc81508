//! Change log entries for downstream change-data-capture consumers.

use crate::document::{ID_FIELD, META_FIELD};
use crate::query::values_equal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a logged mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOp {
    /// Insert.
    #[serde(rename = "I")]
    Insert,
    /// Update.
    #[serde(rename = "U")]
    Update,
    /// Remove.
    #[serde(rename = "R")]
    Remove,
}

/// One entry of a collection's change log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    /// Collection the change happened in.
    pub name: String,
    /// Kind of mutation.
    pub operation: ChangeOp,
    /// The document (or, for delta updates, the changed fields).
    pub obj: Value,
}

/// Fields of `new` that differ from `old`, recursing into nested objects.
///
/// The identity and metadata fields are always carried so a consumer can
/// apply the delta.
pub(crate) fn delta(old: &Value, new: &Value) -> Value {
    let mut out = diff_objects(old, new).unwrap_or_default();
    for field in [ID_FIELD, META_FIELD] {
        if let Some(v) = new.get(field) {
            out.insert(field.to_string(), v.clone());
        }
    }
    Value::Object(out)
}

fn diff_objects(old: &Value, new: &Value) -> Option<Map<String, Value>> {
    let new_map = new.as_object()?;
    let old_map = old.as_object();
    let mut out = Map::new();
    for (key, value) in new_map {
        match old_map.and_then(|m| m.get(key)) {
            Some(prev) if values_equal(prev, value) => {}
            Some(prev) if prev.is_object() && value.is_object() => {
                if let Some(nested) = diff_objects(prev, value).filter(|m| !m.is_empty()) {
                    out.insert(key.clone(), Value::Object(nested));
                }
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Some(out)
}
