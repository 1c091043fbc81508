//! File adapter whose saves are totally ordered per database name.

use crate::adapter::PersistenceAdapter;
use crate::error::StorageResult;
use crate::file::FileAdapter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Serialization point for one database name.
#[derive(Debug, Default)]
struct WriteChain {
    lock: Mutex<()>,
    writes: AtomicU64,
}

/// A [`FileAdapter`] that queues concurrent saves of the same database.
///
/// Every save for a given name waits for the previous save of that name to
/// finish before it starts writing, so writes never interleave. Saves to
/// different names proceed independently. Deletes join the same chain.
///
/// # Example
///
/// ```no_run
/// use emberdb_storage::{PersistenceAdapter, QueuedFileAdapter};
/// use std::sync::Arc;
///
/// let adapter = Arc::new(QueuedFileAdapter::new("data"));
/// let handles: Vec<_> = (0..3)
///     .map(|i| {
///         let adapter = Arc::clone(&adapter);
///         std::thread::spawn(move || {
///             adapter.save_database("app.db", format!("{{\"n\":{i}}}").as_bytes())
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap().unwrap();
/// }
/// ```
#[derive(Debug)]
pub struct QueuedFileAdapter {
    inner: FileAdapter,
    chains: Mutex<HashMap<String, Arc<WriteChain>>>,
}

impl QueuedFileAdapter {
    /// Creates a queued adapter storing databases below `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            inner: FileAdapter::new(root),
            chains: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped file adapter.
    #[must_use]
    pub fn inner(&self) -> &FileAdapter {
        &self.inner
    }

    /// Number of completed saves for `name` through this adapter.
    #[must_use]
    pub fn completed_writes(&self, name: &str) -> u64 {
        self.chains
            .lock()
            .get(name)
            .map(|c| c.writes.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn chain(&self, name: &str) -> Arc<WriteChain> {
        let mut chains = self.chains.lock();
        Arc::clone(chains.entry(name.to_string()).or_default())
    }
}

impl PersistenceAdapter for QueuedFileAdapter {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.load_database(name)
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let chain = self.chain(name);
        let _turn = chain.lock.lock();
        trace!(name, bytes = data.len(), "queued save acquired write chain");
        self.inner.save_database(name, data)?;
        chain.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        let chain = self.chain(name);
        let _turn = chain.lock.lock();
        self.inner.delete_database(name)
    }

    fn kind(&self) -> &'static str {
        "queued-file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn queued_save_and_load() {
        let dir = tempdir().unwrap();
        let adapter = QueuedFileAdapter::new(dir.path());

        adapter.save_database("db", b"payload").unwrap();
        assert_eq!(adapter.load_database("db").unwrap(), Some(b"payload".to_vec()));
        assert_eq!(adapter.completed_writes("db"), 1);
    }

    #[test]
    fn queued_concurrent_saves_persist_one_payload() {
        let dir = tempdir().unwrap();
        let adapter = Arc::new(QueuedFileAdapter::new(dir.path()));
        let payloads: Vec<String> = (0..3)
            .map(|i| format!("{{\"writer\":{i},\"body\":\"{}\"}}", "x".repeat(64 * 1024)))
            .collect();

        let handles: Vec<_> = payloads
            .iter()
            .cloned()
            .map(|payload| {
                let adapter = Arc::clone(&adapter);
                thread::spawn(move || adapter.save_database("shared.db", payload.as_bytes()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stored = adapter.load_database("shared.db").unwrap().unwrap();
        let stored = String::from_utf8(stored).unwrap();
        assert!(payloads.contains(&stored));
        assert_eq!(adapter.completed_writes("shared.db"), 3);
    }

    #[test]
    fn queued_names_are_independent() {
        let dir = tempdir().unwrap();
        let adapter = QueuedFileAdapter::new(dir.path());

        adapter.save_database("a", b"1").unwrap();
        adapter.save_database("b", b"2").unwrap();
        adapter.delete_database("a").unwrap();

        assert_eq!(adapter.load_database("a").unwrap(), None);
        assert_eq!(adapter.load_database("b").unwrap(), Some(b"2".to_vec()));
    }
}
