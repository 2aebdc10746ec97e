//! Batch-evicting notification buffer
//!
//! The buffer is a JSON array persisted under
//! [`keys::NOTIFICATION_BUFFER`]. Every append is one read-modify-write of
//! that key. Appends from this process are serialized by an internal lock;
//! appends from another process writing the same key can still race, and one
//! of the two writes may be lost.

use crate::error::Result;
use crate::store::{keys, KvStore};
use crate::types::NotificationItem;
use std::sync::{Arc, Mutex};

/// Maximum number of buffered notifications
pub const BUFFER_CAPACITY: usize = 20;

/// Number of oldest entries dropped when an append finds the buffer full
pub const EVICTION_BATCH: usize = 5;

/// Persisted, bounded sequence of captured notifications
pub struct NotificationBuffer {
    store: Arc<dyn KvStore>,
    write_lock: Mutex<()>,
}

impl NotificationBuffer {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current contents, oldest first.
    ///
    /// A missing, unreadable or malformed value reads as empty.
    pub fn items(&self) -> Vec<NotificationItem> {
        self.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to read notification buffer");
            Vec::new()
        })
    }

    /// Append one item, evicting a batch of the oldest first when full.
    ///
    /// Returns the buffer length after the write. A failed read is returned
    /// as an error and nothing is written.
    pub fn push(&self, item: NotificationItem) -> Result<usize> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut items = self.load()?;
        tracing::debug!(len = items.len(), "Buffer length before add");

        let evicted = evict_for_append(&mut items);
        if evicted > 0 {
            tracing::debug!(evicted, "Trimmed oldest notifications");
        }

        items.push(item);
        let encoded = serde_json::to_string(&items)?;
        self.store.set(keys::NOTIFICATION_BUFFER, &encoded)?;

        Ok(items.len())
    }

    /// Stored contents. Missing or malformed values are empty; store errors
    /// propagate.
    fn load(&self) -> Result<Vec<NotificationItem>> {
        Ok(match self.store.get(keys::NOTIFICATION_BUFFER)? {
            Some(raw) => decode(&raw),
            None => Vec::new(),
        })
    }
}

/// Drop the oldest [`EVICTION_BATCH`] entries if the buffer has no room for
/// one more item. Returns how many entries were removed.
fn evict_for_append(items: &mut Vec<NotificationItem>) -> usize {
    if items.len() < BUFFER_CAPACITY {
        return 0;
    }
    let evicted = EVICTION_BATCH.min(items.len());
    items.drain(..evicted);
    evicted
}

fn decode(raw: &str) -> Vec<NotificationItem> {
    match serde_json::from_str(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding malformed notification buffer");
            Vec::new()
        }
    }
}
