//! SMS message and conversation aggregation
//!
//! All views are computed from the device message store on request. Thread
//! summaries are never stored, so they cannot drift from the messages they
//! summarize.
//!
//! Every operation degrades instead of failing: a store error or a missing
//! permission yields an empty list, zero, or `false`.

use crate::contacts::{normalize_number, ContactResolver};
use crate::error::{Error, Result};
use crate::platform::{ContactDirectory, MessageStore, SmsFilter, SmsQuery};
use crate::types::{message_uri, Message, SmsRow, Thread};
use std::collections::HashMap;
use std::sync::Arc;

/// Default limit for [`MessageAggregator::pending_messages`]
pub const DEFAULT_PENDING_LIMIT: usize = 50;

/// Default limit for [`MessageAggregator::all_messages`]
pub const DEFAULT_ALL_LIMIT: usize = 100;

/// Read and mutate the device message store on behalf of the automation engine
pub struct MessageAggregator {
    store: Arc<dyn MessageStore>,
    contacts: ContactResolver,
}

impl MessageAggregator {
    pub fn new(store: Arc<dyn MessageStore>, contacts: Arc<dyn ContactDirectory>) -> Self {
        Self {
            store,
            contacts: ContactResolver::new(contacts),
        }
    }

    /// Unread received messages, newest first.
    ///
    /// `limit` caps the rows read from the store before outgoing rows are
    /// dropped, so fewer than `limit` messages may come back.
    pub fn pending_messages(&self, limit: usize) -> Vec<Message> {
        self.incoming(SmsQuery::newest(SmsFilter::Unread, Some(limit)), "pending")
    }

    /// Received messages, read or not, newest first. Same limit semantics as
    /// [`pending_messages`](Self::pending_messages).
    pub fn all_messages(&self, limit: usize) -> Vec<Message> {
        self.incoming(SmsQuery::newest(SmsFilter::All, Some(limit)), "all")
    }

    /// Every message exchanged with `phone_number`, in both directions, newest first.
    ///
    /// Formatting is ignored: the digits of `phone_number` are matched as a
    /// substring of the digits of each sender address.
    pub fn messages_from_contact(&self, phone_number: &str) -> Vec<Message> {
        let digits = normalize_number(phone_number);
        let rows = self.rows(
            &SmsQuery::newest(SmsFilter::AddressDigits(digits), None),
            "contact",
        );
        rows.into_iter().map(|row| self.enrich(row)).collect()
    }

    /// Conversation summaries in thread id order.
    ///
    /// Rows without a conversation (thread id <= 0) are left out. Within a
    /// thread the scan is newest first, so the first row seen supplies the
    /// contact, the last message and the last timestamp.
    pub fn threads(&self) -> Vec<Thread> {
        let rows = self.rows(&SmsQuery::by_thread(), "threads");

        let mut threads: Vec<Thread> = Vec::new();
        let mut index: HashMap<i64, usize> = HashMap::new();

        for row in rows {
            if row.thread_id <= 0 {
                continue;
            }

            match index.get(&row.thread_id) {
                Some(&i) => {
                    let thread = &mut threads[i];
                    thread.message_count += 1;
                    if !row.read {
                        thread.unread_count += 1;
                    }
                }
                None => {
                    index.insert(row.thread_id, threads.len());
                    threads.push(Thread {
                        thread_id: row.thread_id,
                        contact_name: self.contacts.resolve(&row.address),
                        contact: row.address,
                        last_message_body: row.body,
                        last_timestamp_millis: row.date_millis,
                        unread_count: usize::from(!row.read),
                        message_count: 1,
                    });
                }
            }
        }

        tracing::debug!(threads = threads.len(), "Aggregated message threads");
        threads
    }

    /// Number of unread messages in any mailbox
    pub fn unread_count(&self) -> usize {
        match self.store.count_unread() {
            Ok(count) => count,
            Err(e) => {
                log_store_error("unread_count", &e);
                0
            }
        }
    }

    /// Mark one message as read. True when the message exists, including when
    /// it was already read.
    pub fn mark_as_read(&self, message_id: &str) -> bool {
        self.mutate("mark_as_read", message_id, self.store.mark_read(message_id))
    }

    /// Delete one message. True when a message was removed.
    pub fn delete_message(&self, message_id: &str) -> bool {
        self.mutate("delete_message", message_id, self.store.delete(message_id))
    }

    fn mutate(&self, operation: &str, message_id: &str, result: Result<usize>) -> bool {
        match result {
            Ok(rows) => {
                tracing::debug!(operation, uri = %message_uri(message_id), rows, "Message store updated");
                rows > 0
            }
            Err(e) => {
                log_store_error(operation, &e);
                false
            }
        }
    }

    fn incoming(&self, query: SmsQuery, operation: &str) -> Vec<Message> {
        self.rows(&query, operation)
            .into_iter()
            .filter(|row| row.message_box.is_incoming())
            .map(|row| self.enrich(row))
            .collect()
    }

    fn rows(&self, query: &SmsQuery, operation: &str) -> Vec<SmsRow> {
        match self.store.query(query) {
            Ok(rows) => rows,
            Err(e) => {
                log_store_error(operation, &e);
                Vec::new()
            }
        }
    }

    fn enrich(&self, row: SmsRow) -> Message {
        let sender_name = self.contacts.resolve(&row.address);
        Message::from_row(row, sender_name)
    }
}

fn log_store_error(operation: &str, error: &Error) {
    match error {
        Error::PermissionDenied(permission) => {
            tracing::debug!(operation, %permission, "Permission denied, returning no data")
        }
        e => tracing::warn!(operation, error = %e, "Message store access failed"),
    }
}
