//! File-based persistence adapter with atomic writes.

use crate::adapter::PersistenceAdapter;
use crate::error::{StorageError, StorageResult};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, trace};

/// A file-based persistence adapter.
///
/// Each database name maps to one file below a root directory.
/// Data survives process restarts.
///
/// # Durability
///
/// `save_database` writes to a temporary file in the target directory,
/// syncs it, then renames it over the target. A crash never leaves a
/// half-written database file behind: readers see either the old or the
/// new contents. Missing parent directories are created on save.
///
/// # Example
///
/// ```no_run
/// use emberdb_storage::{FileAdapter, PersistenceAdapter};
///
/// let adapter = FileAdapter::new("data");
/// adapter.save_database("app.db", b"{}").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct FileAdapter {
    root: PathBuf,
}

impl FileAdapter {
    /// Creates an adapter storing databases below `root`.
    ///
    /// The directory is created lazily on the first save.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a database name to its file path.
    ///
    /// Names may contain relative subdirectories but may not escape the root.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidName`] for empty, absolute or `..` names.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Writes `data` to `path` through a synced temp file and a rename.
    pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut temp = NamedTempFile::new_in(&parent)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;
        trace!(temp = ?temp.path(), target = ?path, "renaming temp file over target");
        temp.persist(path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl PersistenceAdapter for FileAdapter {
    fn load_database(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(name)?;
        match fs::read(&path) {
            Ok(data) => {
                debug!(path = ?path, bytes = data.len(), "loaded database file");
                Ok(Some(data))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_database(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.path_for(name)?;
        Self::write_atomic(&path, data)?;
        debug!(path = ?path, bytes = data.len(), "saved database file");
        Ok(())
    }

    fn delete_database(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn kind(&self) -> &'static str {
        "file"
    }
}
