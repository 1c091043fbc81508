//! Documents, identities and engine-owned metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// A stored document. Always a JSON object once inside a collection.
pub type Document = Value;

/// Identity of a document within its collection.
pub type DocId = u64;

/// Name of the identity field.
pub const ID_FIELD: &str = "$id";

/// Name of the metadata field.
pub const META_FIELD: &str = "meta";

/// Engine-owned metadata stamped on every document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// Insertion time, milliseconds since the Unix epoch.
    pub created: u64,
    /// Time of the latest update. Absent until the first update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
    /// Number of successful updates.
    pub revision: u64,
}

impl Meta {
    /// Metadata for a freshly inserted document.
    pub fn created_at(now: u64) -> Self {
        Self {
            created: now,
            updated: None,
            revision: 0,
        }
    }

    /// Reads the metadata of a stored document, if present and well formed.
    pub fn of(doc: &Value) -> Option<Self> {
        doc.get(META_FIELD)
            .and_then(|m| Self::deserialize(m).ok())
    }

    /// The metadata following a successful update.
    #[must_use]
    pub fn bumped(self, now: u64) -> Self {
        Self {
            created: self.created,
            updated: Some(now),
            revision: self.revision + 1,
        }
    }

    /// Timestamp used for TTL expiry.
    pub fn last_touched(&self) -> u64 {
        self.updated.unwrap_or(self.created)
    }

    pub(crate) fn to_value(self) -> Value {
        let mut map = Map::new();
        map.insert("created".into(), self.created.into());
        if let Some(updated) = self.updated {
            map.insert("updated".into(), updated.into());
        }
        map.insert("revision".into(), self.revision.into());
        Value::Object(map)
    }
}

/// Returns the identity of a document, if it carries one.
pub fn doc_id(doc: &Value) -> Option<DocId> {
    doc.get(ID_FIELD).and_then(Value::as_u64)
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns a copy of `doc` without its metadata field.
pub fn strip_meta(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove(META_FIELD);
            Value::Object(map)
        }
        other => other.clone(),
    }
}
