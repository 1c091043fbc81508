//! Collection counters and database statistics.
//!
//! Counters are atomic so read paths (`find`, `count`) can record scans and
//! index lookups through a shared reference.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one collection.
///
/// Values are monotonically increasing for the lifetime of the in-memory
/// collection and are not persisted.
#[derive(Debug, Default)]
pub struct CollectionStats {
    /// Documents inserted.
    inserts: AtomicU64,
    /// Documents updated.
    updates: AtomicU64,
    /// Documents removed.
    removes: AtomicU64,
    /// Queries answered by a full scan.
    scans: AtomicU64,
    /// Queries narrowed through a binary index.
    index_lookups: AtomicU64,
}

impl CollectionStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_index_lookup(&self) {
        self.index_lookups.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of inserted documents.
    pub fn inserts(&self) -> u64 {
        self.inserts.load(Ordering::Relaxed)
    }

    /// Returns the number of updated documents.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    /// Returns the number of removed documents.
    pub fn removes(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    /// Returns the number of full scans.
    ///
    /// High scan counts on a large collection may indicate a missing index.
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Returns the number of index-narrowed queries.
    pub fn index_lookups(&self) -> u64 {
        self.index_lookups.load(Ordering::Relaxed)
    }
}

/// Point-in-time summary of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Number of live documents.
    pub count: usize,
    /// Highest identity handed out.
    pub max_id: u64,
    /// Unsaved mutations pending.
    pub dirty: bool,
    /// Fields with a binary index.
    pub binary_indices: Vec<String>,
    /// Fields with a unique constraint.
    pub unique_fields: Vec<String>,
    /// Names of dynamic views.
    pub dynamic_views: Vec<String>,
    /// Documents inserted since the collection was opened.
    pub inserts: u64,
    /// Documents updated since the collection was opened.
    pub updates: u64,
    /// Documents removed since the collection was opened.
    pub removes: u64,
    /// Full scans since the collection was opened.
    pub scans: u64,
    /// Index-narrowed queries since the collection was opened.
    pub index_lookups: u64,
}

/// Point-in-time summary of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    /// Database file name.
    pub filename: String,
    /// Per-collection summaries, in collection order.
    pub collections: Vec<CollectionSummary>,
}

impl DatabaseStats {
    /// Total number of documents across collections.
    pub fn document_count(&self) -> usize {
        self.collections.iter().map(|c| c.count).sum()
    }

    /// Names of collections with unsaved mutations.
    pub fn dirty_collections(&self) -> Vec<&str> {
        self.collections
            .iter()
            .filter(|c| c.dirty)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let stats = CollectionStats::new();
        stats.record_insert();
        stats.record_insert();
        stats.record_scan();
        stats.record_index_lookup();
        assert_eq!(stats.inserts(), 2);
        assert_eq!(stats.scans(), 1);
        assert_eq!(stats.index_lookups(), 1);
        assert_eq!(stats.removes(), 0);
    }
}
