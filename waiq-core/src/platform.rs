//! Device collaborator traits
//!
//! The engine never talks to a platform API directly. Every device signal is
//! read through one of these traits so the aggregation logic can run against
//! the SQLite-backed [`Device`](crate::db::Device) or any other host.
//!
//! Implementations report a missing grant as
//! [`Error::PermissionDenied`](crate::Error::PermissionDenied); callers in
//! this crate treat that exactly like "no data".

use crate::error::Result;
use crate::types::{Location, LocationProvider, SmsRow};
use std::fmt;

/// A device capability the engine may need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadSms,
    ReadContacts,
    Location,
    Wifi,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ReadSms => "read_sms",
            Permission::ReadContacts => "read_contacts",
            Permission::Location => "location",
            Permission::Wifi => "wifi",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row selection for a message store query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsFilter {
    All,
    /// Rows whose read flag is unset
    Unread,
    /// Rows whose address, reduced to digits, contains these digits
    AddressDigits(String),
}

/// Row ordering for a message store query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsOrder {
    /// Date descending
    NewestFirst,
    /// Thread id ascending, then date descending
    ByThreadNewestFirst,
}

/// Selection, ordering and limit for one message store query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsQuery {
    pub filter: SmsFilter,
    pub order: SmsOrder,
    /// Applied by the store after ordering, before any caller-side filtering
    pub limit: Option<usize>,
}

impl SmsQuery {
    /// Newest-first query with an optional limit
    pub fn newest(filter: SmsFilter, limit: Option<usize>) -> Self {
        Self {
            filter,
            order: SmsOrder::NewestFirst,
            limit,
        }
    }

    /// Full scan grouped by thread, newest first within each thread
    pub fn by_thread() -> Self {
        Self {
            filter: SmsFilter::All,
            order: SmsOrder::ByThreadNewestFirst,
            limit: None,
        }
    }
}

/// The device message store. Owned by the platform; this crate only reads
/// it and routes single-row mutations through it.
pub trait MessageStore: Send + Sync {
    fn query(&self, query: &SmsQuery) -> Result<Vec<SmsRow>>;

    /// Sets the read flag on the addressed row, returning the affected row count
    fn mark_read(&self, id: &str) -> Result<usize>;

    /// Removes the addressed row, returning the affected row count
    fn delete(&self, id: &str) -> Result<usize>;

    /// Number of rows with the read flag unset, in any mailbox
    fn count_unread(&self) -> Result<usize>;
}

/// The device contact directory
pub trait ContactDirectory: Send + Sync {
    /// Display name registered for a phone number or other sender identifier
    fn display_name(&self, identifier: &str) -> Result<Option<String>>;
}

/// The current Wi-Fi connection
pub trait WifiSource: Send + Sync {
    /// Raw SSID as reported by the platform, possibly quoted or a sentinel
    fn ssid(&self) -> Result<Option<String>>;
}

/// Last-known location fixes
pub trait LocationSource: Send + Sync {
    fn last_known(&self, provider: LocationProvider) -> Result<Option<Location>>;
}
