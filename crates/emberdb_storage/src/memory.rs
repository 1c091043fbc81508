//! In-memory persistence adapter for testing.

use crate::adapter::PersistenceAdapter;
use crate::error::StorageResult;
use parking_lot::RwLock;
use std::collections::HashMap;

/// An in-memory persistence adapter.
///
/// This adapter keeps every saved blob in a map and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need durability
///
/// # Thread Safety
///
/// This adapter is thread-safe and can be shared across threads.
///
/// # Example
///
/// ```rust
/// use emberdb_storage::{MemoryAdapter, PersistenceAdapter};
///
/// let adapter = MemoryAdapter::new();
/// adapter.save_database("app.db", b"{}").unwrap();
/// assert_eq!(adapter.load_database("app.db").unwrap(), Some(b"{}".to_vec()));
/// assert_eq!(adapter.load_database("other.db").unwrap(), None);
/// ```
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryAdapter {
    /// Creates a new empty in-memory adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter with a pre-existing blob.
    ///
    /// Useful for testing load paths.
    #[must_use]
    pub fn with_data(name: impl Into<String>, data: Vec<u8>) -> Self {
        let adapter = Self::new();
        adapter.blobs.write().insert(name.into(), data);
        adapter
    }

    /// Returns true if a blob is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.blobs.read().contains_key(name)
    }

    /// Returns the names of all stored blobs, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Replaces a stored blob without going through `save_database`.
    ///
    /// Lets tests simulate corruption of the persisted bytes.
    pub fn overwrite_raw(&self, name: &str, data: Vec<u8>) {
        self.blobs.write().insert(name.to_string(), data);
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.blobs.read().get(name).cloned())
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        self.blobs.write().insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        self.blobs.write().remove(name);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
