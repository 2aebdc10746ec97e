//! Persisted key-value store
//!
//! The engine persists its aggregates as strings under fixed keys. The store
//! guarantees atomic get/set of a single key and nothing more: there is no
//! compare-and-swap and no multi-key transaction, so two read-modify-write
//! sequences on the same key can lose an update.
//!
//! [`Database`](crate::db::Database) provides the durable implementation;
//! [`MemoryKvStore`] is for embedding and tests.

use crate::error::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// Keys read by the automation engine
pub mod keys {
    /// JSON array of captured notifications
    pub const NOTIFICATION_BUFFER: &str = "notif.buffer";
    /// JSON object with the merged ambient context
    pub const CONTEXT: &str = "flutter.automation.mode.context";
    /// Last sampled SSID, empty when none
    pub const SENSE_WIFI: &str = "flutter.sense.wifi";
    /// Last sampled location as `"lat,lon"`
    pub const SENSE_LOCATION: &str = "flutter.sense.location";
}

/// String-keyed store with per-key atomic reads and writes
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-process [`KvStore`] backed by a hash map
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn values(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
