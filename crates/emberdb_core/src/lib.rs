//! # EmberDB Core
//!
//! Embedded, in-process document database engine.
//!
//! This crate provides:
//! - A MongoDB-style query engine compiled to a typed AST
//! - Collections with identity, metadata, binary and unique indices
//! - Lazy chainable result sets and incrementally maintained dynamic views
//! - Change logs, event feeds and TTL expiry
//! - A database orchestrator with save, load and autosave through
//!   pluggable [`PersistenceAdapter`]s
//!
//! ## Example
//!
//! ```rust
//! use emberdb_core::{CollectionOptions, Database, DynamicViewOptions};
//! use serde_json::json;
//!
//! let db = Database::in_memory("quickstart.db");
//! let users = db.add_collection("users", CollectionOptions::new().index("age")).unwrap();
//!
//! let mut users = users.write();
//! users.insert(vec![
//!     json!({"name": "Alice", "age": 25}),
//!     json!({"name": "Bob", "age": 30}),
//! ]).unwrap();
//!
//! let older = users.chain().find(json!({"age": {"$gt": 25}})).unwrap().data();
//! assert_eq!(older[0]["name"], "Bob");
//!
//! users
//!     .add_dynamic_view("thirties", DynamicViewOptions::new().persistent(true))
//!     .unwrap()
//!     .apply_find(json!({"age": {"$between": [30, 39]}}), None)
//!     .unwrap();
//! assert_eq!(users.get_dynamic_view("thirties").unwrap().count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
mod config;
mod database;
mod document;
mod dynamic_view;
mod error;
mod events;
pub mod query;
mod resultset;
mod stats;
mod task;

pub use collection::{
    Change, ChangeOp, Collection, CollectionHandle, SerializedCollection, TransformStep,
    PARAM_PREFIX,
};
pub use config::{CollectionOptions, DatabaseConfig, DynamicViewOptions, SerializationMethod};
pub use database::{
    CollectionInfo, Database, SerializedDatabase, DATABASE_VERSION, DESTRUCTURED_DELIMITER,
};
pub use document::{doc_id, now_millis, strip_meta, DocId, Document, Meta, ID_FIELD, META_FIELD};
pub use dynamic_view::{
    DynamicView, DynamicViewMut, DynamicViewRef, FilterKind, SerializedView, SortSpec, ViewFilter,
};
pub use error::{DbError, DbResult, ErrorKind};
pub use events::{CollectionEvent, DatabaseEvent, EventFeed, ViewEvent};
pub use query::{IntoQuery, Operator, Query, SortCriterion};
pub use resultset::{DataOptions, JoinSource, ResultSet};
pub use stats::{CollectionStats, CollectionSummary, DatabaseStats};
pub use task::{PeriodicTask, StopToken, TaskControl};

// Re-exported so callers can construct adapters without a direct dependency.
pub use emberdb_storage::{
    CompressedAdapter, EncryptedAdapter, FileAdapter, MemoryAdapter, PersistenceAdapter,
    QueuedFileAdapter, StorageError,
};
