//! # waiq-core
//!
//! Signal capture and aggregation engine for the waiq personal assistant.
//!
//! This library provides:
//! - A batch-evicting notification buffer with promotional filtering
//! - SMS message and conversation aggregation over the device message store
//! - A periodic context merge of Wi-Fi and location samples
//! - SQLite-backed device tables and key-value store
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Two producers write into the persisted key-value store without
//! coordinating with each other:
//! - **Notification capture**: host callback, one call per posted notification
//! - **Context sampler**: timer-driven, every [`context::SAMPLE_INTERVAL`]
//!
//! An external automation engine reads the persisted values on demand. Message
//! views are computed synchronously on request and never persisted.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use waiq_core::{Config, ContextMerger, Database, Device};
//!
//! let config = Config::load().expect("failed to load config");
//!
//! let db = Database::open(&config.database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let db = Arc::new(db);
//! let device = Arc::new(Device::new(db.clone(), config.permissions.clone()));
//! let merger = ContextMerger::new(db, device.clone(), device);
//! merger.sample();
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use context::ContextMerger;
pub use db::{Database, Device};
pub use error::{Error, Result};
pub use messages::MessageAggregator;
pub use notifications::{NotificationCapture, PostedNotification};
pub use store::{KvStore, MemoryKvStore};
pub use types::*;

// Public modules
pub mod config;
pub mod contacts;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod messages;
pub mod notifications;
pub mod platform;
pub mod store;
pub mod types;
