//! Persistence adapter trait definition.

use crate::error::StorageResult;
use std::sync::Arc;

/// The load/save/delete boundary between EmberDB and durable storage.
///
/// Adapters store **opaque named blobs**. They do not interpret the
/// serialized database text; EmberDB owns the format. Any backend that
/// implements these three operations can be plugged into a database.
///
/// # Invariants
///
/// - `load_database` returns exactly the bytes of the last successful `save_database`
/// - loading a name that was never saved (or was deleted) returns `Ok(None)`
/// - deleting a name that does not exist succeeds
/// - adapters must be `Send + Sync` so autosave can run on a background thread
///
/// # Implementors
///
/// - [`super::MemoryAdapter`] - For tests and ephemeral databases
/// - [`super::FileAdapter`] - One file per database, written atomically
/// - [`super::QueuedFileAdapter`] - File adapter with totally ordered saves per name
/// - [`super::EncryptedAdapter`] - AES-256-GCM decorator
/// - [`super::CompressedAdapter`] - gzip decorator
pub trait PersistenceAdapter: Send + Sync {
    /// Loads the blob stored under `name`.
    ///
    /// Returns `Ok(None)` if nothing is stored under that name.
    ///
    /// # Errors
    ///
    /// Returns an error for any I/O failure other than "not found", or if a
    /// decorating adapter cannot decode the stored payload.
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `data` under `name`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the data cannot be written.
    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()>;

    /// Deletes the blob stored under `name`.
    ///
    /// Deleting a missing blob is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be removed.
    fn delete_database(&self, name: &str) -> StorageResult<()>;

    /// Short adapter name used in log output.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Arc<A> {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).load_database(name)
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        (**self).save_database(name, data)
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        (**self).delete_database(name)
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}

impl<A: PersistenceAdapter + ?Sized> PersistenceAdapter for Box<A> {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).load_database(name)
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        (**self).save_database(name, data)
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        (**self).delete_database(name)
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}
