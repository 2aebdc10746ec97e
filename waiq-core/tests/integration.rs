//! Integration tests for the waiq engine
//!
//! These tests run every component against one file-backed database the way
//! the host daemon wires them: the database serves as the key-value store and,
//! through a permission-gated `Device`, as the platform message store, contact
//! directory, Wi-Fi source and location source.

use std::sync::Arc;
use tempfile::TempDir;
use waiq_core::config::{CaptureConfig, Permissions};
use waiq_core::context::ContextMerger;
use waiq_core::db::{Database, Device, NewSms};
use waiq_core::messages::MessageAggregator;
use waiq_core::notifications::{CaptureOutcome, NotificationExtras, BUFFER_CAPACITY};
use waiq_core::store::{keys, KvStore};
use waiq_core::types::{Location, LocationProvider, MessageBox};
use waiq_core::{NotificationCapture, PostedNotification};

struct Harness {
    _temp_dir: TempDir,
    db: Arc<Database>,
}

impl Harness {
    fn new() -> Self {
        waiq_core::logging::init_test();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("data.db")).expect("failed to open db");
        db.migrate().expect("failed to migrate db");
        Self {
            _temp_dir: temp_dir,
            db: Arc::new(db),
        }
    }

    fn device(&self, permissions: Permissions) -> Arc<Device> {
        Arc::new(Device::new(self.db.clone(), permissions))
    }

    fn aggregator(&self, permissions: Permissions) -> MessageAggregator {
        let device = self.device(permissions);
        MessageAggregator::new(device.clone(), device)
    }

    fn merger(&self, permissions: Permissions) -> ContextMerger {
        let device = self.device(permissions);
        ContextMerger::new(self.db.clone(), device.clone(), device)
    }

    fn capture(&self) -> NotificationCapture {
        NotificationCapture::new(self.db.clone(), &CaptureConfig::default())
    }
}

fn posted(package: &str, title: &str, text: &str) -> PostedNotification {
    PostedNotification {
        package: package.to_string(),
        extras: NotificationExtras {
            title: Some(title.to_string()),
            text: Some(text.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

// ============================================
// Notification capture
// ============================================

#[test]
fn test_buffer_survives_reopen_and_stays_bounded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.db");

    {
        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();
        let capture = NotificationCapture::new(Arc::new(db), &CaptureConfig::default());
        for n in 1..=25 {
            let outcome = capture.capture_at(
                &posted("org.telegram.messenger", &format!("#{}", n), "hi"),
                n,
            );
            assert!(matches!(outcome, CaptureOutcome::Stored { .. }));
        }
    }

    let db = Database::open(&path).unwrap();
    db.migrate().unwrap();
    let capture = NotificationCapture::new(Arc::new(db), &CaptureConfig::default());
    let items = capture.buffer().items();
    assert!(items.len() <= BUFFER_CAPACITY);
    let stamps: Vec<i64> = items.iter().map(|i| i.timestamp_millis).collect();
    assert_eq!(stamps, (6..=25).collect::<Vec<_>>());
}

#[test]
fn test_screened_notifications_never_reach_the_store() {
    let h = Harness::new();
    let capture = h.capture();

    let own = posted(&CaptureConfig::default().own_package, "Reminder", "Stand up");
    let promo = posted("com.google.android.apps.messaging", "همراه اول", "هدیه ویژه");
    let denied = posted("com.xiaomi.mirror", "Sharing", "3 files");
    let blank = posted("com.whatsapp", " ", "");

    for n in [&own, &promo, &denied, &blank] {
        assert!(matches!(capture.capture(n), CaptureOutcome::Skipped(_)));
    }
    assert!(h.db.get(keys::NOTIFICATION_BUFFER).unwrap().is_none());

    let plain = posted("com.google.android.apps.messaging", "Mom", "Dinner at 8?");
    assert_eq!(
        capture.capture(&plain),
        CaptureOutcome::Stored { buffered: 1 }
    );
}

// ============================================
// Message aggregation
// ============================================

#[test]
fn test_inbox_views_over_device_store() {
    let h = Harness::new();
    h.db.upsert_contact("+98 912 111 2233", Some("Sara")).unwrap();

    for i in 0..22 {
        h.db.insert_sms(&NewSms::incoming("+989121112233", &format!("u{}", i), 1_000 + i, 3))
            .unwrap();
    }
    h.db.insert_sms(&NewSms {
        read: true,
        message_box: MessageBox::Sent,
        ..NewSms::incoming("+989121112233", "reply", 5_000, 3)
    })
    .unwrap();

    let aggregator = h.aggregator(Permissions::default());

    let pending = aggregator.pending_messages(5);
    assert_eq!(pending.len(), 5);
    assert_eq!(pending[0].body, "u21");
    assert!(pending
        .windows(2)
        .all(|w| w[0].timestamp_millis >= w[1].timestamp_millis));
    assert!(pending.iter().all(|m| m.sender_name == "Sara"));

    let from = aggregator.messages_from_contact("09121112233");
    assert!(from.is_empty(), "leading trunk zero is not in the stored digits");
    let from = aggregator.messages_from_contact("912-111-2233");
    assert_eq!(from.len(), 23);
    assert_eq!(from[0].body, "reply");

    let threads = aggregator.threads();
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].message_count, 23);
    assert_eq!(threads[0].unread_count, 22);
    assert_eq!(threads[0].last_message_body, "reply");
    assert_eq!(threads[0].contact_name, "Sara");

    assert_eq!(aggregator.unread_count(), 22);
}

#[test]
fn test_mutations_round_trip() {
    let h = Harness::new();
    let id = h
        .db
        .insert_sms(&NewSms::incoming("+1", "hello", 10, 1))
        .unwrap()
        .to_string();
    let aggregator = h.aggregator(Permissions::default());

    assert!(aggregator.mark_as_read(&id));
    assert!(aggregator.pending_messages(50).is_empty());
    assert_eq!(aggregator.all_messages(100).len(), 1);

    assert!(aggregator.delete_message(&id));
    assert!(aggregator.all_messages(100).is_empty());
    assert!(!aggregator.delete_message(&id));
    assert!(!aggregator.mark_as_read("not-a-number"));
}

#[test]
fn test_sms_permission_revoked() {
    let h = Harness::new();
    h.db.insert_sms(&NewSms::incoming("+1", "hello", 10, 1))
        .unwrap();
    let aggregator = h.aggregator(Permissions {
        read_sms: false,
        ..Permissions::default()
    });

    assert!(aggregator.pending_messages(50).is_empty());
    assert!(aggregator.threads().is_empty());
    assert_eq!(aggregator.unread_count(), 0);
}

// ============================================
// Context merge
// ============================================

#[test]
fn test_context_merge_alongside_other_producers() {
    let h = Harness::new();
    h.db.set(keys::CONTEXT, r#"{"calendar":"meeting","wifi":"Old"}"#)
        .unwrap();
    h.db.set_wifi_ssid(Some("\"Office\"")).unwrap();
    h.db.record_location_fix(
        LocationProvider::Gps,
        &Location {
            latitude: 35.70,
            longitude: 51.40,
            acquired_at_millis: 2_000,
        },
    )
    .unwrap();
    h.db.record_location_fix(
        LocationProvider::Network,
        &Location {
            latitude: 35.0,
            longitude: 51.0,
            acquired_at_millis: 1_000,
        },
    )
    .unwrap();

    let merger = h.merger(Permissions::default());
    let report = merger.sample();
    assert!(report.context_written);
    assert_eq!(report.location.map(|l| l.acquired_at_millis), Some(2_000));

    let ctx: serde_json::Value =
        serde_json::from_str(&h.db.get(keys::CONTEXT).unwrap().unwrap()).unwrap();
    assert_eq!(ctx["calendar"], "meeting");
    assert_eq!(ctx["wifi"], "Office");
    assert_eq!(ctx["lat"].as_f64(), Some(35.7));

    // Disconnect: the old SSID stays in the context, the mirror goes blank
    h.db.set_wifi_ssid(None).unwrap();
    merger.sample();
    let ctx: serde_json::Value =
        serde_json::from_str(&h.db.get(keys::CONTEXT).unwrap().unwrap()).unwrap();
    assert_eq!(ctx["wifi"], "Office");
    assert_eq!(h.db.get(keys::SENSE_WIFI).unwrap().as_deref(), Some(""));
}

#[test]
fn test_capture_and_sampler_share_the_store() {
    let h = Harness::new();
    let capture = h.capture();
    let merger = h.merger(Permissions::none());

    capture.capture(&posted("com.whatsapp", "Ali", "ok"));
    merger.sample();
    capture.capture(&posted("com.whatsapp", "Ali", "on my way"));

    assert_eq!(capture.buffer().items().len(), 2);
    assert_eq!(h.db.get(keys::CONTEXT).unwrap().as_deref(), Some("{}"));
    assert_eq!(
        h.db.get(keys::SENSE_LOCATION).unwrap().as_deref(),
        Some("null,null")
    );
}
