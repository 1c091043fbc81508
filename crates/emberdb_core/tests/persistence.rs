//! Saving, loading and autosaving through the bundled adapters.

use emberdb_core::{
    CollectionOptions, CompressedAdapter, Database, DatabaseConfig, DatabaseEvent,
    DynamicViewOptions, EncryptedAdapter, FileAdapter, MemoryAdapter, PersistenceAdapter,
    QueuedFileAdapter, SerializationMethod, StorageError, DESTRUCTURED_DELIMITER,
};
use serde_json::{json, Value};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn seed(db: &Database) {
    let users = db
        .add_collection("users", CollectionOptions::new().index("age").unique("name"))
        .unwrap();
    let mut users = users.write();
    users
        .insert(vec![
            json!({"name": "Alice", "age": 25, "active": true}),
            json!({"name": "Bob", "age": 30, "active": false}),
        ])
        .unwrap();
    users
        .add_dynamic_view("active", DynamicViewOptions::new().persistent(true))
        .unwrap()
        .apply_find(json!({"active": true}), Some("only-active"))
        .unwrap();
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    done()
}

#[test]
fn file_roundtrip_restores_collections_indices_and_views() {
    let dir = tempdir().unwrap();
    let db = Database::new("app.db", FileAdapter::new(dir.path()), DatabaseConfig::default()).unwrap();
    seed(&db);
    db.save().unwrap();
    assert!(!db.has_dirty_collections());

    let config = DatabaseConfig::new().autoload(true);
    let reopened = Database::open("app.db", FileAdapter::new(dir.path()), config).unwrap();
    let users = reopened.get_collection("users").unwrap();
    let users = users.read();
    assert_eq!(users.len(), 2);
    assert_eq!(users.binary_index_fields(), vec!["age"]);
    assert_eq!(users.unique_fields(), vec!["name"]);
    assert_eq!(users.by("name", &json!("Bob")).unwrap().unwrap()["age"], 30);
    assert_eq!(users.get_dynamic_view("active").unwrap().count(), 1);
    assert!(!users.is_dirty());
}

#[test]
fn open_without_stored_file_starts_empty() {
    let dir = tempdir().unwrap();
    let db = Database::new("missing.db", FileAdapter::new(dir.path()), DatabaseConfig::default()).unwrap();
    let events = db.subscribe();
    assert!(!db.load().unwrap());
    assert!(db.collection_names().is_empty());
    assert_eq!(events.try_recv().unwrap(), DatabaseEvent::Init);
}

#[test]
fn every_serialization_method_roundtrips() {
    for method in [
        SerializationMethod::Normal,
        SerializationMethod::Pretty,
        SerializationMethod::Destructured,
    ] {
        let store = Arc::new(MemoryAdapter::new());
        let config = DatabaseConfig::new().serialization_method(method);
        let db = Database::new("app.db", Arc::clone(&store), config.clone()).unwrap();
        seed(&db);
        db.save().unwrap();

        let text = String::from_utf8(store.load_database("app.db").unwrap().unwrap()).unwrap();
        assert_eq!(
            text.contains(DESTRUCTURED_DELIMITER),
            method == SerializationMethod::Destructured,
            "{method:?}"
        );

        let restored = Database::new("app.db", Arc::clone(&store), config).unwrap();
        assert!(restored.load().unwrap());
        let users = restored.get_collection("users").unwrap();
        assert_eq!(users.read().chain().data(), db.get_collection("users").unwrap().read().chain().data());
    }
}

#[test]
fn corrupt_payload_fails_and_keeps_state() {
    let store = Arc::new(MemoryAdapter::new());
    let db = Database::new("app.db", Arc::clone(&store), DatabaseConfig::default()).unwrap();
    seed(&db);
    store.overwrite_raw("app.db", b"{not json".to_vec());

    assert!(db.load().is_err());
    assert_eq!(db.collection_names(), vec!["users"]);
}

#[test]
fn autosave_flushes_dirty_collections() {
    let dir = tempdir().unwrap();
    let config = DatabaseConfig::new()
        .autosave(true)
        .autosave_interval(Duration::from_millis(20));
    let db = Database::new("auto.db", FileAdapter::new(dir.path()), config).unwrap();
    assert!(db.autosave_enabled());

    seed(&db);
    assert!(wait_until(Duration::from_secs(5), || !db.has_dirty_collections()));
    assert!(dir.path().join("auto.db").exists());

    db.configure_autosave(false, Duration::from_millis(20)).unwrap();
    assert!(!db.autosave_enabled());
    db.close().unwrap();
}

#[test]
fn close_saves_pending_changes_when_autosaving() {
    let store = Arc::new(MemoryAdapter::new());
    let config = DatabaseConfig::new()
        .autosave(true)
        .autosave_interval(Duration::from_secs(3600));
    let db = Database::new("app.db", Arc::clone(&store), config).unwrap();
    seed(&db);

    db.close().unwrap();
    assert!(store.contains("app.db"));
    assert!(!db.autosave_enabled());
}

#[test]
fn queued_adapter_serializes_concurrent_saves() {
    let dir = tempdir().unwrap();
    let adapter = Arc::new(QueuedFileAdapter::new(dir.path()));
    let dbs: Vec<Database> = (0..3)
        .map(|i| {
            let db = Database::new("shared.db", Arc::clone(&adapter), DatabaseConfig::default()).unwrap();
            let c = db.add_collection("writers", CollectionOptions::default()).unwrap();
            c.write().insert_one(json!({"writer": i})).unwrap();
            db
        })
        .collect();

    thread::scope(|scope| {
        for db in &dbs {
            scope.spawn(move || db.save().unwrap());
        }
    });

    assert_eq!(adapter.completed_writes("shared.db"), 3);
    let text = adapter.load_database("shared.db").unwrap().unwrap();
    let parsed: Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(parsed["collections"][0]["data"].as_array().unwrap().len(), 1);
}

#[test]
fn compressed_encrypted_file_stack() {
    let dir = tempdir().unwrap();
    let adapter = CompressedAdapter::new(EncryptedAdapter::new(FileAdapter::new(dir.path()), "pw"));
    let db = Database::new("vault.db", adapter, DatabaseConfig::default()).unwrap();
    seed(&db);
    db.save().unwrap();

    let raw = std::fs::read(dir.path().join("vault.db")).unwrap();
    assert!(!raw.windows(5).any(|w| w == b"Alice"));

    let adapter = CompressedAdapter::new(EncryptedAdapter::new(FileAdapter::new(dir.path()), "pw"));
    let restored = Database::new("vault.db", adapter, DatabaseConfig::default()).unwrap();
    assert!(restored.load().unwrap());
    assert_eq!(restored.get_collection("users").unwrap().read().len(), 2);

    let wrong = EncryptedAdapter::new(FileAdapter::new(dir.path()), "nope");
    let locked = Database::new("vault.db", wrong, DatabaseConfig::default()).unwrap();
    assert!(locked.load().is_err());
}

#[test]
fn ttl_expires_old_documents() {
    let db = Database::in_memory("ttl.db");
    let options = CollectionOptions::new().ttl(Duration::from_millis(30), Duration::from_millis(10));
    let sessions = db.add_collection("sessions", options).unwrap();
    sessions.write().insert_one(json!({"token": "abc"})).unwrap();

    assert!(wait_until(Duration::from_secs(5), || sessions.read().is_empty()));
    db.close().unwrap();
    assert!(!sessions.read().has_ttl_task());
}

/// Memory adapter whose saves signal `entered` and then wait for `release`.
struct GatedAdapter {
    inner: MemoryAdapter,
    entered: Mutex<Sender<()>>,
    release: Mutex<Receiver<()>>,
}

impl PersistenceAdapter for GatedAdapter {
    fn load_database(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.load_database(name)
    }

    fn save_database(&self, name: &str, data: &[u8]) -> Result<(), StorageError> {
        let _ = self.entered.lock().unwrap().send(());
        let _ = self.release.lock().unwrap().recv();
        self.inner.save_database(name, data)
    }

    fn delete_database(&self, name: &str) -> Result<(), StorageError> {
        self.inner.delete_database(name)
    }
}

struct FailingAdapter;

impl PersistenceAdapter for FailingAdapter {
    fn load_database(&self, _name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn save_database(&self, _name: &str, _data: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk full")))
    }

    fn delete_database(&self, _name: &str) -> Result<(), StorageError> {
        Ok(())
    }
}

fn stored_rows(adapter: &GatedAdapter) -> usize {
    let text = adapter.inner.load_database("app.db").unwrap().unwrap();
    let parsed: Value = serde_json::from_slice(&text).unwrap();
    parsed["collections"][0]["data"].as_array().unwrap().len()
}

#[test]
fn write_during_save_stays_dirty() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let adapter = Arc::new(GatedAdapter {
        inner: MemoryAdapter::new(),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
    });
    let db = Database::new("app.db", Arc::clone(&adapter), DatabaseConfig::default()).unwrap();
    let users = db.add_collection("users", CollectionOptions::default()).unwrap();
    users.write().insert_one(json!({"n": 1})).unwrap();

    thread::scope(|scope| {
        let saver = scope.spawn(|| db.save());
        entered_rx.recv().unwrap();
        users.write().insert_one(json!({"n": 2})).unwrap();
        release_tx.send(()).unwrap();
        saver.join().unwrap().unwrap();
    });

    assert_eq!(stored_rows(&adapter), 1);
    assert_eq!(db.get_dirty_collections(), vec!["users"]);

    release_tx.send(()).unwrap();
    db.save().unwrap();
    assert_eq!(stored_rows(&adapter), 2);
    assert!(!db.has_dirty_collections());
}

#[test]
fn failed_save_keeps_collections_dirty() {
    let db = Database::new("app.db", FailingAdapter, DatabaseConfig::default()).unwrap();
    let users = db.add_collection("users", CollectionOptions::default()).unwrap();
    users.write().insert_one(json!({"n": 1})).unwrap();
    let untouched = db.add_collection("untouched", CollectionOptions::default()).unwrap();
    untouched.write().mark_clean();

    assert!(db.save().is_err());
    assert_eq!(db.get_dirty_collections(), vec!["users"]);
}
