//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use emberdb_core::{Database, DatabaseConfig};
use emberdb_storage::FileAdapter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tempfile::TempDir;

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::in_memory("test.db"),
            temp_dir: None,
        }
    }

    /// Creates a new database stored through a [`FileAdapter`] rooted in a
    /// temporary directory.
    pub fn file() -> Self {
        Self::file_with_config(DatabaseConfig::default())
    }

    /// Like [`file`](Self::file) with a custom configuration.
    pub fn file_with_config(config: DatabaseConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let adapter = FileAdapter::new(temp_dir.path());
        let db = Database::new("test.db", adapter, config).expect("Failed to open file database");
        Self {
            db,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the temporary directory if file-based, None if in-memory.
    pub fn dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the path of the stored database file, if file-based.
    pub fn path(&self) -> Option<PathBuf> {
        self.dir().map(|d| d.join(self.db.filename()))
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use emberdb_core::CollectionOptions;
/// use emberdb_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     db.add_collection("test", CollectionOptions::default()).unwrap();
///     assert_eq!(db.collection_names(), vec!["test"]);
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-based database and its directory.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let dir = test_db.dir().expect("File database should have a directory");
    f(&test_db.db, dir)
}

/// Installs a `tracing` subscriber honouring `RUST_LOG`, once per process.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A typed document used by the seeded scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Display name.
    pub name: String,
    /// Age in years; absent for some fixtures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Home city.
    pub city: String,
    /// Whether the account is active.
    pub active: bool,
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use emberdb_core::{CollectionHandle, CollectionOptions};

    /// The people inserted by [`people`].
    pub fn people_fixture() -> Vec<Person> {
        let person = |name: &str, age: Option<u32>, city: &str, active: bool| Person {
            name: name.to_string(),
            age,
            city: city.to_string(),
            active,
        };
        vec![
            person("Alice", Some(25), "Oslo", true),
            person("Bob", Some(30), "Rome", true),
            person("Carol", Some(35), "Oslo", false),
            person("Dave", None, "Rome", true),
            person("Erin", Some(17), "Lima", false),
        ]
    }

    /// Adds a `people` collection indexed on `age`, unique on `name`, seeded
    /// with [`people_fixture`].
    pub fn people(db: &Database) -> CollectionHandle {
        let handle = db
            .add_collection(
                "people",
                CollectionOptions::new().index("age").unique("name"),
            )
            .expect("Failed to add collection");
        {
            let mut people = handle.write();
            for person in people_fixture() {
                people.insert_typed(&person).expect("Failed to insert person");
            }
        }
        handle
    }

    /// Adds `count` collections named `collection_{i}` with one document each.
    pub fn multi_collection_database(db: &Database, count: usize) -> Vec<CollectionHandle> {
        (0..count)
            .map(|i| {
                let handle = db
                    .add_collection(&format!("collection_{i}"), CollectionOptions::default())
                    .expect("Failed to add collection");
                handle
                    .write()
                    .insert_one(serde_json::json!({ "collection": i }))
                    .expect("Failed to insert document");
                handle
            })
            .collect()
    }
}
