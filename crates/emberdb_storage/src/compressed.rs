//! Gzip-compressing persistence adapter decorator.

use crate::adapter::PersistenceAdapter;
use crate::error::{StorageError, StorageResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::debug;

/// Default gzip level.
pub const DEFAULT_LEVEL: u32 = 6;

/// An adapter that gzip-compresses blobs before handing them to an inner adapter.
///
/// Loads decompress transparently. A stored blob that is not valid gzip
/// fails with [`StorageError::Compression`].
///
/// # Example
///
/// ```rust
/// use emberdb_storage::{CompressedAdapter, MemoryAdapter, PersistenceAdapter};
///
/// let adapter = CompressedAdapter::new(MemoryAdapter::new());
/// adapter.save_database("app.db", &[b'a'; 4096]).unwrap();
/// assert_eq!(adapter.load_database("app.db").unwrap().unwrap().len(), 4096);
/// ```
#[derive(Debug)]
pub struct CompressedAdapter<A> {
    inner: A,
    level: u32,
}

impl<A: PersistenceAdapter> CompressedAdapter<A> {
    /// Wraps `inner` with the default compression level.
    pub fn new(inner: A) -> Self {
        Self::with_level(inner, DEFAULT_LEVEL)
    }

    /// Wraps `inner` with an explicit gzip level (0-9).
    pub fn with_level(inner: A, level: u32) -> Self {
        Self {
            inner,
            level: level.min(9),
        }
    }

    /// Returns the wrapped adapter.
    pub fn inner(&self) -> &A {
        &self.inner
    }

    /// Compresses a payload.
    pub fn compress(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    /// Decompresses a payload produced by [`compress`](Self::compress).
    pub fn decompress(&self, data: &[u8]) -> StorageResult<Vec<u8>> {
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| StorageError::compression(e.to_string()))?;
        Ok(out)
    }
}

impl<A: PersistenceAdapter> PersistenceAdapter for CompressedAdapter<A> {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.inner.load_database(name)? {
            Some(packed) => self.decompress(&packed).map(Some),
            None => Ok(None),
        }
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let packed = self.compress(data)?;
        debug!(name, plain = data.len(), packed = packed.len(), "compressed database payload");
        self.inner.save_database(name, &packed)
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        self.inner.delete_database(name)
    }

    fn kind(&self) -> &'static str {
        "gzip"
    }
}
