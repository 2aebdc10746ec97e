//! Notification capture
//!
//! The host calls [`NotificationCapture::capture`] for every posted
//! notification. Accepted notifications are reduced to title and body and
//! appended to the persisted [`NotificationBuffer`]; everything else is
//! dropped silently. Capture never returns an error to the host.
//!
//! A notification is dropped when:
//! - it was posted by this application
//! - it is ongoing (music players, foreground services, downloads)
//! - title and body are both blank
//! - its package is on [`DENIED_PACKAGES`]
//! - it looks promotional (see [`filter::is_promotional`])

pub mod buffer;
pub mod filter;

pub use buffer::{NotificationBuffer, BUFFER_CAPACITY, EVICTION_BATCH};
pub use filter::is_promotional;

use crate::config::CaptureConfig;
use crate::store::KvStore;
use crate::types::NotificationItem;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

/// File-sharing utilities whose progress notifications are pure noise
pub const DENIED_PACKAGES: &[&str] = &["com.lenovo.anyshare.gps", "com.xiaomi.mirror"];

/// Text fields a posted notification may carry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationExtras {
    #[serde(default)]
    pub title: Option<String>,
    /// Primary content text
    #[serde(default)]
    pub text: Option<String>,
    /// Expanded text of big-text style notifications
    #[serde(default)]
    pub big_text: Option<String>,
    /// Summary / info text
    #[serde(default)]
    pub info_text: Option<String>,
    /// Lines of inbox style notifications
    #[serde(default)]
    pub text_lines: Option<Vec<String>>,
}

impl NotificationExtras {
    /// Body text: the first present of text, big text and info text. When
    /// that is absent or blank, the inbox lines joined with single spaces.
    pub fn body(&self) -> String {
        let direct = [&self.text, &self.big_text, &self.info_text]
            .into_iter()
            .flatten()
            .next();
        if let Some(direct) = direct.filter(|s| !s.trim().is_empty()) {
            return direct.clone();
        }

        match &self.text_lines {
            Some(lines) if !lines.is_empty() => lines.join(" "),
            _ => String::new(),
        }
    }
}

/// A notification as posted to the host's notification shade
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostedNotification {
    /// Package identifier of the posting application
    pub package: String,
    /// Persistent notifications the user cannot dismiss
    #[serde(default)]
    pub ongoing: bool,
    #[serde(default)]
    pub extras: NotificationExtras,
    #[serde(default)]
    pub category: Option<String>,
}

/// Why a notification was not buffered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    OwnPackage,
    Ongoing,
    Empty,
    DeniedPackage,
    Promotional,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::OwnPackage => "own_package",
            SkipReason::Ongoing => "ongoing",
            SkipReason::Empty => "empty",
            SkipReason::DeniedPackage => "denied_package",
            SkipReason::Promotional => "promotional",
        }
    }
}

/// What a capture call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Appended; `buffered` is the buffer length after the write
    Stored { buffered: usize },
    Skipped(SkipReason),
    /// Accepted but could not be persisted (already logged)
    Failed,
}

/// Notification listener: screens posted notifications and buffers the rest
pub struct NotificationCapture {
    own_package: String,
    buffer: NotificationBuffer,
}

impl NotificationCapture {
    pub fn new(store: Arc<dyn KvStore>, config: &CaptureConfig) -> Self {
        Self {
            own_package: config.own_package.clone(),
            buffer: NotificationBuffer::new(store),
        }
    }

    pub fn buffer(&self) -> &NotificationBuffer {
        &self.buffer
    }

    /// Capture a notification stamped with the current time
    pub fn capture(&self, notification: &PostedNotification) -> CaptureOutcome {
        self.capture_at(notification, Utc::now().timestamp_millis())
    }

    /// Capture a notification stamped with `captured_at_millis`
    pub fn capture_at(
        &self,
        notification: &PostedNotification,
        captured_at_millis: i64,
    ) -> CaptureOutcome {
        let package = notification.package.as_str();
        tracing::debug!(package, "Capturing notification");

        let item = match self.screen(notification) {
            Ok((title, body)) => NotificationItem {
                title,
                body,
                source_package: package.to_string(),
                timestamp_millis: captured_at_millis,
                category: notification
                    .category
                    .clone()
                    .filter(|c| !c.trim().is_empty()),
            },
            Err(reason) => {
                tracing::debug!(package, reason = reason.as_str(), "Skipping notification");
                return CaptureOutcome::Skipped(reason);
            }
        };

        match self.buffer.push(item) {
            Ok(buffered) => {
                tracing::debug!(package, buffered, "Notification buffered");
                CaptureOutcome::Stored { buffered }
            }
            Err(e) => {
                tracing::error!(package, error = %e, "Failed to cache notification");
                CaptureOutcome::Failed
            }
        }
    }

    /// Capture every notification that was already showing when the
    /// listener connected. Returns how many were stored.
    pub fn capture_active<'a, I>(&self, active: I) -> usize
    where
        I: IntoIterator<Item = &'a PostedNotification>,
    {
        let stored = active
            .into_iter()
            .map(|n| self.capture(n))
            .filter(|outcome| matches!(outcome, CaptureOutcome::Stored { .. }))
            .count();
        tracing::info!(stored, "Cached active notifications");
        stored
    }

    /// Extract title and body, or the reason the notification is dropped
    fn screen(
        &self,
        notification: &PostedNotification,
    ) -> std::result::Result<(String, String), SkipReason> {
        let package = notification.package.as_str();

        if package == self.own_package {
            return Err(SkipReason::OwnPackage);
        }
        if notification.ongoing {
            return Err(SkipReason::Ongoing);
        }

        let title = notification.extras.title.clone().unwrap_or_default();
        let body = notification.extras.body();
        if title.trim().is_empty() && body.trim().is_empty() {
            return Err(SkipReason::Empty);
        }

        if DENIED_PACKAGES.contains(&package) {
            return Err(SkipReason::DeniedPackage);
        }
        if is_promotional(&title, &body, package) {
            return Err(SkipReason::Promotional);
        }

        Ok((title, body))
    }
}
