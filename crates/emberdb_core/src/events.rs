//! Event feeds for observing collections, views and databases.
//!
//! Each observable object owns an [`EventFeed`]. Subscribers receive an
//! mpsc [`Receiver`] and get every event emitted after they subscribed, in
//! emission order. Dropped receivers are pruned on the next emit.
//!
//! ```rust
//! use emberdb_core::{Collection, CollectionEvent, CollectionOptions};
//! use serde_json::json;
//!
//! let mut users = Collection::new("users", CollectionOptions::default());
//! let events = users.subscribe();
//! users.insert_one(json!({"name": "alice"})).unwrap();
//!
//! assert!(matches!(events.try_recv(), Ok(CollectionEvent::Insert { .. })));
//! ```

use crate::document::DocId;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::mpsc::{self, Receiver, Sender};

/// Mutation notifications emitted by a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    /// A document was inserted.
    Insert {
        /// The stored document.
        doc: Value,
    },
    /// A document was updated.
    Update {
        /// The document after the update.
        doc: Value,
        /// The document before the update.
        old: Value,
    },
    /// A document was removed.
    Delete {
        /// Identity of the removed document.
        id: DocId,
    },
    /// Something noteworthy but non-fatal happened.
    Warning {
        /// Description.
        message: String,
    },
}

/// Notifications emitted by a dynamic view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// A filter was added or removed.
    FilterApplied,
    /// The sort specification changed.
    SortApplied,
    /// The materialized result was recomputed; carries its new size.
    Rebuild {
        /// Number of documents in the view.
        count: usize,
    },
}

/// Lifecycle notifications emitted by a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseEvent {
    /// `load` found nothing stored and initialized an empty database.
    Init,
    /// A stored database was loaded.
    Loaded,
    /// The database was written through its adapter.
    Saved,
    /// The database was closed.
    Close,
    /// A background task hit a non-fatal problem.
    Warning {
        /// Description.
        message: String,
    },
}

/// Fan-out of events to any number of mpsc subscribers.
#[derive(Debug)]
pub struct EventFeed<E> {
    subscribers: RwLock<Vec<Sender<E>>>,
}

impl<E: Clone> EventFeed<E> {
    /// Creates a feed with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribes to the feed.
    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Delivers `event` to every live subscriber.
    pub fn emit(&self, event: E) {
        let mut subscribers = self.subscribers.write();
        if subscribers.is_empty() {
            return;
        }
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Returns true if anyone is listening.
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<E: Clone> Default for EventFeed<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_in_order() {
        let feed = EventFeed::new();
        let rx = feed.subscribe();

        feed.emit(DatabaseEvent::Init);
        feed.emit(DatabaseEvent::Saved);

        assert_eq!(rx.try_recv().unwrap(), DatabaseEvent::Init);
        assert_eq!(rx.try_recv().unwrap(), DatabaseEvent::Saved);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let feed = EventFeed::new();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 2);

        drop(rx1);
        feed.emit(ViewEvent::FilterApplied);
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(rx2.try_recv().unwrap(), ViewEvent::FilterApplied);
    }

    #[test]
    fn late_subscriber_misses_earlier_events() {
        let feed = EventFeed::new();
        feed.emit(ViewEvent::SortApplied);
        let rx = feed.subscribe();
        assert!(rx.try_recv().is_err());
        assert!(feed.has_subscribers());
    }
}
