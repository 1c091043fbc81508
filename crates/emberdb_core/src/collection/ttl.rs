//! Time-to-live expiry.
//!
//! The sweep runs on a [`PeriodicTask`] that holds only a weak handle, so a
//! dropped collection ends its own sweep.

use super::{Collection, CollectionHandle};
use crate::document::{now_millis, DocId, Meta};
use crate::error::DbResult;
use crate::task::{PeriodicTask, TaskControl};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

impl Collection {
    /// Configures TTL expiry on a shared collection and starts the sweep.
    ///
    /// Documents whose `meta.updated`, or `meta.created` if never updated,
    /// is older than `age` are removed every `interval`. A previously
    /// running sweep is stopped first.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the sweep thread cannot be spawned.
    pub fn set_ttl(handle: &CollectionHandle, age: Duration, interval: Duration) -> DbResult<()> {
        let mut collection = handle.write();
        collection.stop_ttl();
        collection.options.ttl = Some(age);
        collection.options.ttl_interval = Some(interval);

        let weak = Arc::downgrade(handle);
        let task_name = format!("emberdb-ttl-{}", collection.name);
        let task = PeriodicTask::spawn(task_name, interval, move |token| {
            let Some(handle) = weak.upgrade() else {
                return TaskControl::Stop;
            };
            let mut collection = handle.write();
            if token.is_stopped() {
                return TaskControl::Stop;
            }
            let evicted = collection.evict_expired(now_millis());
            if evicted > 0 {
                debug!(collection = %collection.name, evicted, "ttl sweep removed documents");
            }
            TaskControl::Continue
        })?;
        collection.ttl_task = Some(task);
        Ok(())
    }

    /// Starts the sweep configured in the collection options, if any.
    ///
    /// # Errors
    ///
    /// As for [`set_ttl`](Self::set_ttl).
    pub fn arm_ttl(handle: &CollectionHandle) -> DbResult<()> {
        let (ttl, interval) = {
            let collection = handle.read();
            (collection.options.ttl, collection.options.ttl_interval)
        };
        match (ttl, interval) {
            (Some(age), Some(interval)) => Self::set_ttl(handle, age, interval),
            (Some(_), None) => {
                warn!(collection = %handle.read().name, "ttl configured without an interval, not sweeping");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Removes every document last touched more than the TTL age before
    /// `now` (milliseconds since the epoch). Returns the number removed.
    ///
    /// Documents without metadata never expire.
    pub fn evict_expired(&mut self, now: u64) -> usize {
        let Some(age) = self.options.ttl else {
            return 0;
        };
        let age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now.saturating_sub(age_ms);
        let expired: Vec<DocId> = self
            .store
            .iter()
            .filter(|(_, doc)| Meta::of(doc).is_some_and(|m| m.last_touched() < cutoff))
            .map(|(id, _)| id)
            .collect();
        expired
            .into_iter()
            .filter(|&id| self.remove_by_id(id).is_ok())
            .count()
    }

    /// Returns true while a TTL sweep is scheduled.
    pub fn has_ttl_task(&self) -> bool {
        self.ttl_task.as_ref().is_some_and(|t| !t.is_stopped())
    }

    /// Cancels the TTL sweep. Once this returns no further sweep runs.
    pub fn stop_ttl(&mut self) {
        if let Some(task) = self.ttl_task.take() {
            task.stop();
        }
    }
}
