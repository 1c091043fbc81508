//! # EmberDB Testkit
//!
//! Test utilities for EmberDB.
//!
//! This crate provides:
//! - Test fixtures: temporary databases, seeded collections, log setup
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use emberdb_testkit::prelude::*;
//! use serde_json::json;
//!
//! with_temp_db(|db| {
//!     let people = scenarios::people(db);
//!     let adults = people.read().count(json!({"age": {"$gte": 18}})).unwrap();
//!     assert!(adults > 0);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
