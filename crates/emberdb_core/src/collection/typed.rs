//! Typed access to a collection through serde.
//!
//! Documents stay `serde_json::Value` inside the collection. These helpers
//! convert at the boundary so callers can work with their own structs:
//!
//! ```rust
//! use emberdb_core::{Collection, CollectionOptions};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! let mut users = Collection::new("users", CollectionOptions::default());
//! users.insert_typed(&User { name: "Alice".into(), age: 30 }).unwrap();
//!
//! let adults: Vec<User> = users.find_as(json!({"age": {"$gte": 18}})).unwrap();
//! assert_eq!(adults[0].name, "Alice");
//! ```
//!
//! Unknown fields such as `$id` and `meta` are ignored on the way out unless
//! the target struct declares them.

use super::Collection;
use crate::document::DocId;
use crate::error::{DbError, DbResult};
use crate::query::IntoQuery;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

impl Collection {
    /// Serializes `value` and inserts it.
    ///
    /// # Errors
    ///
    /// Fails if `value` does not serialize to a JSON object, or as
    /// [`insert_one`](Collection::insert_one).
    pub fn insert_typed<T: Serialize>(&mut self, value: &T) -> DbResult<Value> {
        let doc = serde_json::to_value(value)?;
        self.insert_one(doc)
    }

    /// Deserializes the document with identity `id`.
    ///
    /// # Errors
    ///
    /// Fails if the stored document does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, id: DocId) -> DbResult<Option<T>> {
        self.get(id)
            .map(|doc| serde_json::from_value(doc.clone()).map_err(DbError::from))
            .transpose()
    }

    /// Deserializes every document matching `query`.
    ///
    /// # Errors
    ///
    /// Fails on a malformed query or a document that does not fit `T`.
    pub fn find_as<T: DeserializeOwned>(&self, query: impl IntoQuery) -> DbResult<Vec<T>> {
        self.chain().find(query)?.data_as()
    }
}
