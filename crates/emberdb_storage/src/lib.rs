//! # EmberDB Storage
//!
//! Persistence adapters for EmberDB.
//!
//! This crate provides the lowest-level persistence abstraction for EmberDB.
//! Adapters are **opaque named blob stores** - they do not interpret the
//! serialized database they are handed.
//!
//! ## Design Principles
//!
//! - Adapters implement three operations: load, save, delete
//! - Loading or deleting a missing database is not an error
//! - No knowledge of collections, documents or the serialization format
//! - Must be `Send + Sync` so autosave can run in the background
//! - Decorators (encryption, compression) wrap any other adapter
//!
//! ## Available Adapters
//!
//! - [`MemoryAdapter`] - For testing and ephemeral databases
//! - [`FileAdapter`] - One file per database, atomic temp-file + rename writes
//! - [`QueuedFileAdapter`] - File adapter with totally ordered saves per name
//! - [`EncryptedAdapter`] - Wrapper that adds AES-256-GCM encryption
//! - [`CompressedAdapter`] - Wrapper that adds gzip compression
//!
//! ## Example
//!
//! ```rust
//! use emberdb_storage::{MemoryAdapter, PersistenceAdapter};
//!
//! let adapter = MemoryAdapter::new();
//! adapter.save_database("app.db", b"{\"collections\":[]}").unwrap();
//! let data = adapter.load_database("app.db").unwrap();
//! assert_eq!(data.as_deref(), Some(&b"{\"collections\":[]}"[..]));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod compressed;
mod encrypted;
mod error;
mod file;
mod memory;
mod queued;

pub use adapter::PersistenceAdapter;
pub use compressed::{CompressedAdapter, DEFAULT_LEVEL};
pub use encrypted::{EncryptedAdapter, EncryptionKey, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::FileAdapter;
pub use memory::MemoryAdapter;
pub use queued::QueuedFileAdapter;
