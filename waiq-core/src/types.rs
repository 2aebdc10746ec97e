//! Core domain types for waiq
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Message** | A single SMS as exposed to the automation engine, enriched with a sender name |
//! | **SmsRow** | A raw row of the device message store |
//! | **Thread** | A conversation: every message sharing a thread identifier |
//! | **NotificationItem** | A captured notification as stored in the notification buffer |
//! | **ContextBlob** | Merged ambient-signal record (`wifi`, `lat`, `lon`, and keys of other producers) |
//!
//! Messages and threads are views. They are recomputed from the message store
//! on every request and never persisted by this crate.

use serde::{Deserialize, Serialize};

/// Merged ambient-signal record persisted as a JSON object
pub type ContextBlob = serde_json::Map<String, serde_json::Value>;

/// Returns the content address used to update or delete a single message
pub fn message_uri(id: &str) -> String {
    format!("content://sms/{}", id)
}

// ============================================
// Messages
// ============================================

/// Transport a message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
}

/// Mailbox a raw message row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBox {
    All,
    /// Received messages
    Inbox,
    Sent,
    Draft,
    Outbox,
    Failed,
    Queued,
}

impl MessageBox {
    /// Numeric code used by the device message store
    pub fn code(&self) -> i32 {
        match self {
            MessageBox::All => 0,
            MessageBox::Inbox => 1,
            MessageBox::Sent => 2,
            MessageBox::Draft => 3,
            MessageBox::Outbox => 4,
            MessageBox::Failed => 5,
            MessageBox::Queued => 6,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MessageBox::All),
            1 => Some(MessageBox::Inbox),
            2 => Some(MessageBox::Sent),
            3 => Some(MessageBox::Draft),
            4 => Some(MessageBox::Outbox),
            5 => Some(MessageBox::Failed),
            6 => Some(MessageBox::Queued),
            _ => None,
        }
    }

    /// Whether the message was received rather than sent by the user
    pub fn is_incoming(&self) -> bool {
        matches!(self, MessageBox::Inbox)
    }
}

/// A raw row of the device message store.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsRow {
    /// Row identifier (string form of the store's primary key)
    pub id: String,
    /// Sender or recipient address as recorded by the store
    pub address: String,
    pub body: String,
    /// Store date column, milliseconds since the Unix epoch
    pub date_millis: i64,
    pub read: bool,
    /// Conversation identifier; values <= 0 mean "no conversation"
    pub thread_id: i64,
    pub message_box: MessageBox,
}

/// An SMS as exposed to the automation engine.
///
/// Identity is `id`. Everything except `is_read` is immutable once read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    /// Raw sender identifier
    pub sender: String,
    /// Contact display name, or the sender identifier when unresolved
    pub sender_name: String,
    pub body: String,
    #[serde(rename = "timestamp")]
    pub timestamp_millis: i64,
    pub channel: Channel,
    pub is_read: bool,
    pub thread_id: i64,
    /// Same instant as `timestamp`, kept for consumers that read `date`
    #[serde(rename = "date")]
    pub date_millis: i64,
}

impl Message {
    /// Build a message view from a raw store row and its resolved sender name
    pub fn from_row(row: SmsRow, sender_name: String) -> Self {
        Self {
            id: row.id,
            sender: row.address,
            sender_name,
            body: row.body,
            timestamp_millis: row.date_millis,
            channel: Channel::Sms,
            is_read: row.read,
            thread_id: row.thread_id,
            date_millis: row.date_millis,
        }
    }
}

/// Summary of one conversation, derived from its messages.
///
/// Invariants: `unread_count <= message_count`, and `last_timestamp_millis`
/// is the largest timestamp among the thread's messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub thread_id: i64,
    /// Address of the most recent message in the thread
    pub contact: String,
    pub contact_name: String,
    #[serde(rename = "lastMessage")]
    pub last_message_body: String,
    #[serde(rename = "lastTimestamp")]
    pub last_timestamp_millis: i64,
    pub unread_count: usize,
    pub message_count: usize,
}

// ============================================
// Notifications
// ============================================

/// A captured notification as persisted in the notification buffer.
///
/// Field names on the wire are the short keys the automation engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationItem {
    pub title: String,
    pub body: String,
    #[serde(rename = "pkg")]
    pub source_package: String,
    /// Capture time, milliseconds since the Unix epoch
    #[serde(rename = "ts")]
    pub timestamp_millis: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

// ============================================
// Location
// ============================================

/// Source of a last-known location fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationProvider {
    /// Fine, satellite based
    Gps,
    /// Coarse, cell and Wi-Fi based
    Network,
}

impl LocationProvider {
    /// Providers in the order they are consulted
    pub const ALL: [LocationProvider; 2] = [LocationProvider::Gps, LocationProvider::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            LocationProvider::Gps => "gps",
            LocationProvider::Network => "network",
        }
    }
}

/// A last-known location fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// When the provider acquired the fix, milliseconds since the Unix epoch
    pub acquired_at_millis: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_box_codes() {
        for code in 0..=6 {
            let mbox = MessageBox::from_code(code).unwrap();
            assert_eq!(mbox.code(), code);
        }
        assert!(MessageBox::from_code(42).is_none());
        assert!(MessageBox::Inbox.is_incoming());
        assert!(!MessageBox::Sent.is_incoming());
    }

    #[test]
    fn test_notification_item_wire_keys() {
        let item = NotificationItem {
            title: "Ali".to_string(),
            body: "see you".to_string(),
            source_package: "org.telegram.messenger".to_string(),
            timestamp_millis: 1_700_000_000_000,
            category: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["pkg"], "org.telegram.messenger");
        assert_eq!(json["ts"], 1_700_000_000_000i64);
        assert!(json.get("category").is_none());
    }

    #[test]
    fn test_thread_wire_keys() {
        let thread = Thread {
            thread_id: 7,
            contact: "+98912".to_string(),
            contact_name: "Sara".to_string(),
            last_message_body: "ok".to_string(),
            last_timestamp_millis: 10,
            unread_count: 1,
            message_count: 2,
        };
        let json = serde_json::to_value(&thread).unwrap();
        assert_eq!(json["threadId"], 7);
        assert_eq!(json["lastMessage"], "ok");
        assert_eq!(json["lastTimestamp"], 10);
        assert_eq!(json["unreadCount"], 1);
    }

    #[test]
    fn test_message_wire_keys() {
        let row = SmsRow {
            id: "3".to_string(),
            address: "+98912".to_string(),
            body: "hi".to_string(),
            date_millis: 1_700_000_000_000,
            read: false,
            thread_id: 7,
            message_box: MessageBox::Inbox,
        };
        let json = serde_json::to_value(Message::from_row(row, "Sara".to_string())).unwrap();
        assert_eq!(json["senderName"], "Sara");
        assert_eq!(json["channel"], "sms");
        assert_eq!(json["isRead"], false);
        assert_eq!(json["threadId"], 7);
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["date"], 1_700_000_000_000i64);
    }

    #[test]
    fn test_message_uri() {
        assert_eq!(message_uri("42"), "content://sms/42");
    }
}
