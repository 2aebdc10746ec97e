//! Database layer for waiq
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Repository pattern for the device tables and the key-value store
//! - A permission-gated device adapter implementing the platform traits

pub mod device;
pub mod repo;
pub mod schema;

pub use device::Device;
pub use repo::{Database, NewSms};
