//! Database facade: named collections, persistence and autosave.

use crate::collection::{Change, Collection, CollectionHandle, SerializedCollection};
use crate::config::{CollectionOptions, DatabaseConfig, SerializationMethod};
use crate::error::{DbError, DbResult};
use crate::events::{DatabaseEvent, EventFeed};
use crate::stats::DatabaseStats;
use crate::task::{PeriodicTask, TaskControl};
use emberdb_storage::{MemoryAdapter, PersistenceAdapter};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Version of the serialized database layout.
pub const DATABASE_VERSION: u32 = 1;

/// Separator between segments of the destructured format.
pub const DESTRUCTURED_DELIMITER: &str = "$<\n";

/// Persistable form of a whole database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDatabase {
    filename: String,
    #[serde(default)]
    database_version: u32,
    #[serde(default)]
    engine_version: String,
    #[serde(default)]
    collections: Vec<SerializedCollection>,
}

impl SerializedDatabase {
    /// Database file name recorded in the snapshot.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The serialized collections, in database order.
    pub fn collections(&self) -> &[SerializedCollection] {
        &self.collections
    }
}

/// Short description of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of live documents.
    pub count: usize,
    /// Unsaved mutations pending.
    pub dirty: bool,
}

struct DatabaseInner {
    filename: String,
    config: RwLock<DatabaseConfig>,
    adapter: Arc<dyn PersistenceAdapter>,
    collections: RwLock<Vec<(String, CollectionHandle)>>,
    autosave: Mutex<Option<PeriodicTask>>,
    events: EventFeed<DatabaseEvent>,
}

/// An in-process document database.
///
/// The database owns its collections and hands out shared
/// [`CollectionHandle`]s. Persistence goes through a
/// [`PersistenceAdapter`], which stores the serialized database as one
/// named blob.
///
/// ```rust
/// use emberdb_core::{CollectionOptions, Database};
/// use serde_json::json;
///
/// let db = Database::in_memory("app.db");
/// let users = db.add_collection("users", CollectionOptions::new().index("age")).unwrap();
/// users.write().insert_one(json!({"name": "alice", "age": 31})).unwrap();
/// db.save().unwrap();
///
/// assert!(!db.has_dirty_collections());
/// ```
///
/// # Locking
///
/// Collections are guarded by `parking_lot` read/write locks. Background
/// autosave and TTL ticks take the same locks, so callers must release a
/// collection guard before calling `close`, `configure_autosave` or `save`.
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    fn build(filename: String, adapter: Arc<dyn PersistenceAdapter>, config: DatabaseConfig) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                filename,
                config: RwLock::new(config),
                adapter,
                collections: RwLock::new(Vec::new()),
                autosave: Mutex::new(None),
                events: EventFeed::new(),
            }),
        }
    }

    /// Creates an empty database persisted through `adapter`.
    ///
    /// Starts autosave when the configuration asks for it. Nothing is
    /// loaded; see [`Database::open`].
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the autosave thread cannot be spawned.
    pub fn new<A>(filename: impl Into<String>, adapter: A, config: DatabaseConfig) -> DbResult<Self>
    where
        A: PersistenceAdapter + 'static,
    {
        let autosave = config.autosave.then_some(config.autosave_interval);
        let db = Self::build(filename.into(), Arc::new(adapter), config);
        if let Some(interval) = autosave {
            db.configure_autosave(true, interval)?;
        }
        info!(filename = %db.inner.filename, adapter = db.inner.adapter.kind(), "database created");
        Ok(db)
    }

    /// Creates a database and, if `config.autoload` is set, loads it.
    ///
    /// # Errors
    ///
    /// Propagates adapter and format errors from the initial load.
    pub fn open<A>(filename: impl Into<String>, adapter: A, config: DatabaseConfig) -> DbResult<Self>
    where
        A: PersistenceAdapter + 'static,
    {
        let autoload = config.autoload;
        let db = Self::new(filename, adapter, config)?;
        if autoload {
            db.load()?;
        }
        Ok(db)
    }

    /// An ephemeral database backed by a [`MemoryAdapter`].
    pub fn in_memory(filename: impl Into<String>) -> Self {
        Self::build(
            filename.into(),
            Arc::new(MemoryAdapter::new()),
            DatabaseConfig::default(),
        )
    }

    /// The name the database is stored under.
    pub fn filename(&self) -> &str {
        &self.inner.filename
    }

    /// A copy of the current configuration.
    pub fn config(&self) -> DatabaseConfig {
        self.inner.config.read().clone()
    }

    /// Subscribes to lifecycle notifications.
    pub fn subscribe(&self) -> Receiver<DatabaseEvent> {
        self.inner.events.subscribe()
    }

    /// Creates a collection.
    ///
    /// A TTL configured in `options` starts sweeping immediately.
    ///
    /// # Errors
    ///
    /// [`DbError::CollectionExists`] if the name is taken, or an I/O error
    /// if the TTL thread cannot be spawned.
    pub fn add_collection(&self, name: &str, options: CollectionOptions) -> DbResult<CollectionHandle> {
        let mut collections = self.inner.collections.write();
        if collections.iter().any(|(n, _)| n == name) {
            return Err(DbError::CollectionExists {
                name: name.to_string(),
            });
        }
        let handle = Collection::new(name, options).into_handle();
        Collection::arm_ttl(&handle)?;
        collections.push((name.to_string(), Arc::clone(&handle)));
        info!(collection = name, "collection added");
        Ok(handle)
    }

    /// The collection called `name`.
    pub fn get_collection(&self, name: &str) -> Option<CollectionHandle> {
        self.inner
            .collections
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, handle)| Arc::clone(handle))
    }

    /// Names of all collections, in creation order.
    pub fn collection_names(&self) -> Vec<String> {
        self.inner
            .collections
            .read()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    /// Name, size and dirty flag of every collection.
    pub fn list_collections(&self) -> Vec<CollectionInfo> {
        self.inner
            .handles()
            .into_iter()
            .map(|(name, handle)| {
                let collection = handle.read();
                CollectionInfo {
                    name,
                    count: collection.len(),
                    dirty: collection.is_dirty(),
                }
            })
            .collect()
    }

    /// Removes a collection and stops its TTL sweep.
    ///
    /// # Errors
    ///
    /// [`DbError::CollectionNotFound`] if the name is unknown.
    pub fn remove_collection(&self, name: &str) -> DbResult<()> {
        let handle = {
            let mut collections = self.inner.collections.write();
            let pos = collections
                .iter()
                .position(|(n, _)| n == name)
                .ok_or_else(|| DbError::collection_not_found(name))?;
            collections.remove(pos).1
        };
        handle.write().stop_ttl();
        info!(collection = name, "collection removed");
        Ok(())
    }

    /// Renames a collection.
    ///
    /// # Errors
    ///
    /// [`DbError::CollectionNotFound`] if `old` is unknown,
    /// [`DbError::CollectionExists`] if `new` is taken.
    pub fn rename_collection(&self, old: &str, new: &str) -> DbResult<CollectionHandle> {
        let mut collections = self.inner.collections.write();
        if collections.iter().any(|(n, _)| n == new) {
            return Err(DbError::CollectionExists {
                name: new.to_string(),
            });
        }
        let entry = collections
            .iter_mut()
            .find(|(n, _)| n == old)
            .ok_or_else(|| DbError::collection_not_found(old))?;
        entry.0 = new.to_string();
        entry.1.write().set_name(new);
        debug!(from = old, to = new, "collection renamed");
        Ok(Arc::clone(&entry.1))
    }

    /// Captures every collection.
    pub fn snapshot(&self) -> SerializedDatabase {
        self.inner.snapshot()
    }

    /// Serializes the database with `method`.
    ///
    /// # Errors
    ///
    /// Fails if a document cannot be encoded.
    pub fn serialize(&self, method: SerializationMethod) -> DbResult<String> {
        self.inner.serialize(method)
    }

    /// Serializes in the destructured layout: the metadata JSON, then every
    /// document on its own segment, with an empty segment after each
    /// collection. Segments end with [`DESTRUCTURED_DELIMITER`].
    ///
    /// # Errors
    ///
    /// Fails if a document cannot be encoded.
    pub fn serialize_destructured(&self) -> DbResult<String> {
        self.inner.serialize(SerializationMethod::Destructured)
    }

    /// Parses text produced by [`serialize_destructured`](Self::serialize_destructured).
    ///
    /// # Errors
    ///
    /// [`DbError::InvalidFormat`] if the stream is truncated, or a
    /// serialization error for a malformed segment.
    pub fn deserialize_destructured(text: &str) -> DbResult<SerializedDatabase> {
        let mut segments = text.split(DESTRUCTURED_DELIMITER);
        let meta = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DbError::invalid_format("destructured stream has no metadata segment"))?;
        let mut snapshot: SerializedDatabase = serde_json::from_str(meta)?;
        for collection in &mut snapshot.collections {
            collection.data.clear();
            loop {
                match segments.next() {
                    Some("") => break,
                    Some(segment) => collection.data.push(serde_json::from_str(segment)?),
                    None => {
                        return Err(DbError::invalid_format(format!(
                            "destructured stream ends inside collection {}",
                            collection.name()
                        )))
                    }
                }
            }
        }
        Ok(snapshot)
    }

    /// Replaces every collection with those described by `text`, in any of
    /// the serialization layouts.
    ///
    /// Nothing changes if `text` cannot be parsed.
    ///
    /// # Errors
    ///
    /// Format, serialization and unique constraint errors from the restore.
    pub fn load_json(&self, text: &str) -> DbResult<()> {
        self.inner.load_text(text)
    }

    /// Serializes the database and writes it through the adapter.
    ///
    /// Every collection is marked clean on success.
    ///
    /// # Errors
    ///
    /// Adapter and serialization errors.
    pub fn save(&self) -> DbResult<()> {
        self.inner.save()
    }

    /// Loads the database from the adapter, replacing every collection.
    ///
    /// Returns `false` and starts from an empty store when nothing is stored
    /// under the file name.
    ///
    /// # Errors
    ///
    /// Adapter errors, or format errors for an unreadable payload.
    pub fn load(&self) -> DbResult<bool> {
        let inner = &self.inner;
        match inner.adapter.load_database(&inner.filename)? {
            None => {
                let old = std::mem::take(&mut *inner.collections.write());
                stop_all_ttl(&old);
                info!(filename = %inner.filename, "nothing stored, initialized empty database");
                inner.events.emit(DatabaseEvent::Init);
                Ok(false)
            }
            Some(bytes) => {
                let text = String::from_utf8(bytes)
                    .map_err(|e| DbError::invalid_format(format!("stored database is not UTF-8: {e}")))?;
                inner.load_text(&text)?;
                info!(filename = %inner.filename, bytes = text.len(), "database loaded");
                inner.events.emit(DatabaseEvent::Loaded);
                Ok(true)
            }
        }
    }

    /// Deletes the stored database. The in-memory collections are kept.
    ///
    /// # Errors
    ///
    /// Adapter errors.
    pub fn delete_database(&self) -> DbResult<()> {
        self.inner.adapter.delete_database(&self.inner.filename)?;
        info!(filename = %self.inner.filename, "stored database deleted");
        Ok(())
    }

    /// Starts or stops the background autosave.
    ///
    /// Ticks skip the write when no collection is dirty. Failures are
    /// logged and reported as [`DatabaseEvent::Warning`], never retried.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the autosave thread cannot be spawned.
    pub fn configure_autosave(&self, enabled: bool, interval: Duration) -> DbResult<()> {
        let mut slot = self.inner.autosave.lock();
        if let Some(task) = slot.take() {
            task.stop_and_join();
        }
        {
            let mut config = self.inner.config.write();
            config.autosave = enabled;
            config.autosave_interval = interval;
        }
        if !enabled {
            debug!(filename = %self.inner.filename, "autosave disabled");
            return Ok(());
        }

        let weak: Weak<DatabaseInner> = Arc::downgrade(&self.inner);
        let task_name = format!("emberdb-autosave-{}", self.inner.filename);
        let task = PeriodicTask::spawn(task_name, interval, move |token| {
            let Some(inner) = weak.upgrade() else {
                return TaskControl::Stop;
            };
            if token.is_stopped() {
                return TaskControl::Stop;
            }
            if !inner.has_dirty_collections() {
                trace!(filename = %inner.filename, "autosave skipped, nothing dirty");
                return TaskControl::Continue;
            }
            if let Err(e) = inner.save() {
                warn!(filename = %inner.filename, error = %e, "autosave failed");
                inner.events.emit(DatabaseEvent::Warning {
                    message: format!("autosave failed: {e}"),
                });
            }
            TaskControl::Continue
        })?;
        *slot = Some(task);
        debug!(filename = %self.inner.filename, ?interval, "autosave enabled");
        Ok(())
    }

    /// Returns true while autosave is scheduled.
    pub fn autosave_enabled(&self) -> bool {
        self.inner
            .autosave
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_stopped())
    }

    /// Summaries of every collection.
    pub fn get_stats(&self) -> DatabaseStats {
        DatabaseStats {
            filename: self.inner.filename.clone(),
            collections: self
                .inner
                .handles()
                .into_iter()
                .map(|(_, handle)| handle.read().summary())
                .collect(),
        }
    }

    /// Names of collections with unsaved mutations.
    pub fn get_dirty_collections(&self) -> Vec<String> {
        self.inner
            .handles()
            .into_iter()
            .filter(|(_, handle)| handle.read().is_dirty())
            .map(|(name, _)| name)
            .collect()
    }

    /// Returns true if any collection has unsaved mutations.
    pub fn has_dirty_collections(&self) -> bool {
        self.inner.has_dirty_collections()
    }

    /// Clears every dirty flag.
    pub fn mark_clean(&self) {
        self.inner.mark_clean();
    }

    /// Logged changes of the named collections, or of all when `names` is
    /// `None`, in collection order.
    pub fn generate_changes_notification(&self, names: Option<&[&str]>) -> Vec<Change> {
        self.inner
            .handles()
            .into_iter()
            .filter(|(name, _)| names.map_or(true, |ns| ns.contains(&name.as_str())))
            .flat_map(|(_, handle)| handle.read().changes().to_vec())
            .collect()
    }

    /// The change notification as JSON.
    ///
    /// # Errors
    ///
    /// Fails if a change cannot be encoded.
    pub fn serialize_changes(&self, names: Option<&[&str]>) -> DbResult<String> {
        Ok(serde_json::to_string(&self.generate_changes_notification(names))?)
    }

    /// Flushes the change log of every collection.
    pub fn clear_changes(&self) {
        for (_, handle) in self.inner.handles() {
            handle.write().flush_changes();
        }
    }

    /// A fully independent copy named `"{filename}.copy"`, sharing the
    /// adapter. Autosave is not started on the copy.
    ///
    /// # Errors
    ///
    /// Serialization and restore errors.
    pub fn copy(&self) -> DbResult<Database> {
        let text = self.serialize(SerializationMethod::Normal)?;
        let config = self.config().autosave(false);
        let copy = Self::build(
            format!("{}.copy", self.inner.filename),
            Arc::clone(&self.inner.adapter),
            config,
        );
        copy.inner.load_text(&text)?;
        Ok(copy)
    }

    /// Stops autosave and every TTL sweep, then emits
    /// [`DatabaseEvent::Close`].
    ///
    /// When autosave was enabled, pending changes are saved first.
    ///
    /// # Errors
    ///
    /// Errors from the final save. Background tasks are stopped either way.
    pub fn close(&self) -> DbResult<()> {
        let autosave = self.inner.autosave.lock().take();
        let was_autosaving = autosave.is_some();
        if let Some(task) = autosave {
            task.stop_and_join();
        }
        let result = if was_autosaving && self.inner.has_dirty_collections() {
            self.inner.save()
        } else {
            Ok(())
        };
        for (_, handle) in self.inner.handles() {
            handle.write().stop_ttl();
        }
        info!(filename = %self.inner.filename, "database closed");
        self.inner.events.emit(DatabaseEvent::Close);
        result
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("filename", &self.inner.filename)
            .field("adapter", &self.inner.adapter.kind())
            .field("collections", &self.collection_names())
            .field("autosave", &self.autosave_enabled())
            .finish()
    }
}

impl DatabaseInner {
    fn handles(&self) -> Vec<(String, CollectionHandle)> {
        self.collections
            .read()
            .iter()
            .map(|(name, handle)| (name.clone(), Arc::clone(handle)))
            .collect()
    }

    fn has_dirty_collections(&self) -> bool {
        self.handles()
            .iter()
            .any(|(_, handle)| handle.read().is_dirty())
    }

    fn mark_clean(&self) {
        for (_, handle) in self.handles() {
            handle.write().mark_clean();
        }
    }

    fn snapshot(&self) -> SerializedDatabase {
        SerializedDatabase {
            filename: self.filename.clone(),
            database_version: DATABASE_VERSION,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            collections: self
                .handles()
                .into_iter()
                .map(|(_, handle)| handle.read().serialize())
                .collect(),
        }
    }

    /// Captures every collection for a save, clearing dirty flags under the
    /// same write lock as the capture. Returns the handles that were dirty.
    fn snapshot_for_save(&self) -> (SerializedDatabase, Vec<CollectionHandle>) {
        let mut flushed = Vec::new();
        let collections = self
            .handles()
            .into_iter()
            .map(|(_, handle)| {
                let mut collection = handle.write();
                if collection.is_dirty() {
                    collection.mark_clean();
                    flushed.push(Arc::clone(&handle));
                }
                collection.serialize()
            })
            .collect();
        let snapshot = SerializedDatabase {
            filename: self.filename.clone(),
            database_version: DATABASE_VERSION,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            collections,
        };
        (snapshot, flushed)
    }

    fn serialize(&self, method: SerializationMethod) -> DbResult<String> {
        encode(self.snapshot(), method)
    }

    fn load_text(&self, text: &str) -> DbResult<()> {
        let snapshot = if text.contains(DESTRUCTURED_DELIMITER) {
            Database::deserialize_destructured(text)?
        } else {
            serde_json::from_str(text)?
        };
        let mut restored = Vec::with_capacity(snapshot.collections.len());
        for serialized in snapshot.collections {
            let collection = Collection::deserialize(serialized)?;
            restored.push((collection.name().to_string(), collection.into_handle()));
        }
        for (_, handle) in &restored {
            Collection::arm_ttl(handle)?;
        }
        let old = std::mem::replace(&mut *self.collections.write(), restored);
        stop_all_ttl(&old);
        Ok(())
    }

    fn save(&self) -> DbResult<()> {
        let method = self.config.read().serialization_method;
        let (snapshot, flushed) = self.snapshot_for_save();
        let written = encode(snapshot, method).and_then(|text| {
            self.adapter.save_database(&self.filename, text.as_bytes())?;
            Ok(text)
        });
        let text = match written {
            Ok(text) => text,
            Err(e) => {
                for handle in &flushed {
                    handle.write().mark_dirty();
                }
                return Err(e);
            }
        };
        info!(filename = %self.filename, bytes = text.len(), ?method, "database saved");
        self.events.emit(DatabaseEvent::Saved);
        Ok(())
    }
}

fn encode(mut snapshot: SerializedDatabase, method: SerializationMethod) -> DbResult<String> {
    Ok(match method {
        SerializationMethod::Normal => serde_json::to_string(&snapshot)?,
        SerializationMethod::Pretty => serde_json::to_string_pretty(&snapshot)?,
        SerializationMethod::Destructured => {
            let documents: Vec<_> = snapshot
                .collections
                .iter_mut()
                .map(|c| std::mem::take(&mut c.data))
                .collect();
            let mut out = serde_json::to_string(&snapshot)?;
            out.push_str(DESTRUCTURED_DELIMITER);
            for docs in documents {
                for doc in docs {
                    out.push_str(&serde_json::to_string(&doc)?);
                    out.push_str(DESTRUCTURED_DELIMITER);
                }
                out.push_str(DESTRUCTURED_DELIMITER);
            }
            out
        }
    })
}

fn stop_all_ttl(collections: &[(String, CollectionHandle)]) {
    for (_, handle) in collections {
        handle.write().stop_ttl();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DynamicViewOptions;
    use serde_json::json;

    fn populated() -> Database {
        let db = Database::in_memory("test.db");
        let users = db
            .add_collection("users", CollectionOptions::new().unique("email").index("age"))
            .unwrap();
        users
            .write()
            .insert(vec![
                json!({"email": "a@x", "age": 30}),
                json!({"email": "b@x", "age": 20}),
            ])
            .unwrap();
        users
            .write()
            .add_dynamic_view("adults", DynamicViewOptions::new().persistent(true))
            .unwrap()
            .apply_find(json!({"age": {"$gte": 21}}), None)
            .unwrap();
        let empty = db.add_collection("empty", CollectionOptions::default()).unwrap();
        drop(empty);
        db
    }

    #[test]
    fn collection_registry() {
        let db = populated();
        assert!(matches!(
            db.add_collection("users", CollectionOptions::default()),
            Err(DbError::CollectionExists { .. })
        ));
        assert!(db.get_collection("missing").is_none());
        assert_eq!(db.collection_names(), vec!["users", "empty"]);

        assert!(matches!(
            db.rename_collection("missing", "x"),
            Err(DbError::CollectionNotFound { .. })
        ));
        assert!(matches!(
            db.rename_collection("users", "empty"),
            Err(DbError::CollectionExists { .. })
        ));
        let renamed = db.rename_collection("users", "people").unwrap();
        assert_eq!(renamed.read().name(), "people");
        assert!(db.get_collection("people").is_some());

        db.remove_collection("empty").unwrap();
        assert!(matches!(
            db.remove_collection("empty"),
            Err(DbError::CollectionNotFound { .. })
        ));
        assert_eq!(db.list_collections()[0].count, 2);
    }

    #[test]
    fn serialize_round_trip_all_methods() {
        let db = populated();
        for method in [
            SerializationMethod::Normal,
            SerializationMethod::Pretty,
            SerializationMethod::Destructured,
        ] {
            let text = db.serialize(method).unwrap();
            let other = Database::in_memory("other.db");
            other.load_json(&text).unwrap();
            assert_eq!(other.collection_names(), vec!["users", "empty"]);
            let users = other.get_collection("users").unwrap();
            let users = users.read();
            assert_eq!(users.len(), 2);
            assert_eq!(users.by("email", &json!("b@x")).unwrap().unwrap()["age"], 20);
            assert_eq!(users.get_dynamic_view("adults").unwrap().count(), 1);
            assert!(users.check_all_indexes().is_empty());
        }
    }

    #[test]
    fn destructured_layout() {
        let db = populated();
        let text = db.serialize_destructured().unwrap();
        let segments: Vec<&str> = text.split(DESTRUCTURED_DELIMITER).collect();
        // meta, two users, end of users, end of empty, trailing
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[3], "");
        assert_eq!(segments[4], "");
        let meta: serde_json::Value = serde_json::from_str(segments[0]).unwrap();
        assert_eq!(meta["collections"][0]["data"], json!([]));

        let truncated = &text[..text.len() - 2 * DESTRUCTURED_DELIMITER.len()];
        assert!(matches!(
            Database::deserialize_destructured(truncated),
            Err(DbError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn save_and_load_through_adapter() {
        let adapter = Arc::new(MemoryAdapter::new());
        let db = Database::new("app.db", Arc::clone(&adapter), DatabaseConfig::default()).unwrap();
        let events = db.subscribe();
        assert!(!db.load().unwrap());
        assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Init);

        let notes = db.add_collection("notes", CollectionOptions::default()).unwrap();
        notes.write().insert_one(json!({"text": "hi"})).unwrap();
        assert_eq!(db.get_dirty_collections(), vec!["notes"]);
        db.save().unwrap();
        assert!(!db.has_dirty_collections());
        assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Saved);
        assert!(adapter.contains("app.db"));

        let reopened = Database::open("app.db", adapter, DatabaseConfig::new().autoload(true)).unwrap();
        let notes = reopened.get_collection("notes").unwrap();
        assert_eq!(notes.read().find(json!({})).unwrap()[0]["text"], "hi");
        assert!(!notes.read().is_dirty());
    }

    #[test]
    fn load_rejects_garbage_and_keeps_state() {
        let adapter = Arc::new(MemoryAdapter::with_data("bad.db", b"not json".to_vec()));
        let db = Database::new("bad.db", adapter, DatabaseConfig::default()).unwrap();
        db.add_collection("keep", CollectionOptions::default()).unwrap();
        assert!(db.load().is_err());
        assert_eq!(db.collection_names(), vec!["keep"]);
    }

    #[test]
    fn change_notifications_span_collections() {
        let db = Database::in_memory("changes.db");
        for name in ["a", "b"] {
            let c = db
                .add_collection(name, CollectionOptions::new().changes_api(true))
                .unwrap();
            c.write().insert_one(json!({"n": 1})).unwrap();
        }
        assert_eq!(db.generate_changes_notification(None).len(), 2);
        assert_eq!(db.generate_changes_notification(Some(&["b"])).len(), 1);
        let json: serde_json::Value =
            serde_json::from_str(&db.serialize_changes(Some(&["a"])).unwrap()).unwrap();
        assert_eq!(json[0]["operation"], "I");
        assert_eq!(json[0]["name"], "a");

        db.clear_changes();
        assert!(db.generate_changes_notification(None).is_empty());
    }

    #[test]
    fn copy_is_independent() {
        let db = populated();
        let copy = db.copy().unwrap();
        assert_eq!(copy.filename(), "test.db.copy");

        copy.get_collection("users")
            .unwrap()
            .write()
            .insert_one(json!({"email": "c@x"}))
            .unwrap();
        assert_eq!(copy.get_collection("users").unwrap().read().len(), 3);
        assert_eq!(db.get_collection("users").unwrap().read().len(), 2);
    }

    #[test]
    fn stats_and_mark_clean() {
        let db = populated();
        let stats = db.get_stats();
        assert_eq!(stats.document_count(), 2);
        assert_eq!(stats.dirty_collections(), vec!["users"]);
        assert_eq!(stats.collections[0].binary_indices, vec!["age".to_string()]);
        db.mark_clean();
        assert!(db.get_dirty_collections().is_empty());
    }

    #[test]
    fn close_stops_ttl_and_emits() {
        let db = Database::in_memory("close.db");
        let events = db.subscribe();
        let c = db
            .add_collection(
                "s",
                CollectionOptions::new().ttl(Duration::from_secs(60), Duration::from_millis(5)),
            )
            .unwrap();
        assert!(c.read().has_ttl_task());
        db.close().unwrap();
        assert!(!c.read().has_ttl_task());
        assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Close);
    }
}
