//! Query and match engine.
//!
//! Pure functions with no shared state:
//! - [`Query`] compiles MongoDB-style query objects into a typed AST
//! - [`resolve_path`] looks up dot-separated paths
//! - [`compare_values`] is the total order used for sorting and indexing
//! - comparator builders for single and compound sorts
//!
//! ```rust
//! use emberdb_core::Query;
//! use serde_json::json;
//!
//! let query = Query::parse(&json!({"age": {"$gte": 18}, "tags": {"$contains": "admin"}})).unwrap();
//! assert!(query.matches(&json!({"age": 40, "tags": ["admin", "ops"]})));
//! assert!(!query.matches(&json!({"age": 12, "tags": ["admin"]})));
//! ```

mod ast;
mod sort;
mod value;

pub use ast::{Derived, Operator, Query};
pub use sort::{
    compare_field, compound_comparator, simple_comparator, Comparator, Predicate, SortCriterion,
};
pub use value::{compare_values, resolve_path, values_equal};

pub(crate) use value::type_rank;

use crate::error::DbResult;
use serde_json::Value;

/// Anything that can be turned into a compiled [`Query`].
pub trait IntoQuery {
    /// Compiles `self`.
    ///
    /// # Errors
    ///
    /// Fails when a JSON query is malformed or names an unknown operator.
    fn into_query(self) -> DbResult<Query>;
}

impl IntoQuery for Query {
    fn into_query(self) -> DbResult<Query> {
        Ok(self)
    }
}

impl IntoQuery for &Query {
    fn into_query(self) -> DbResult<Query> {
        Ok(self.clone())
    }
}

impl IntoQuery for Value {
    fn into_query(self) -> DbResult<Query> {
        Query::parse(&self)
    }
}

impl IntoQuery for &Value {
    fn into_query(self) -> DbResult<Query> {
        Query::parse(self)
    }
}
