//! Database repository layer
//!
//! Provides query and write operations for the device tables and the
//! key-value store.

use crate::contacts::normalize_number;
use crate::error::{Error, Result};
use crate::platform::{SmsFilter, SmsOrder, SmsQuery};
use crate::store::KvStore;
use crate::types::*;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// A message to insert into the device message store.
///
/// Used by host shims that mirror the platform store and by tests.
#[derive(Debug, Clone)]
pub struct NewSms {
    pub address: String,
    pub body: String,
    pub date_millis: i64,
    pub read: bool,
    pub thread_id: i64,
    pub message_box: MessageBox,
}

impl NewSms {
    /// An unread received message
    pub fn incoming(address: &str, body: &str, date_millis: i64, thread_id: i64) -> Self {
        Self {
            address: address.to_string(),
            body: body.to_string(),
            date_millis,
            read: false,
            thread_id,
            message_box: MessageBox::Inbox,
        }
    }
}

/// Database handle with connection pooling (single connection for now)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL lets the sampler and the listener write from separate processes
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.connection();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ============================================
    // Message store operations
    // ============================================

    /// Insert a message, returning its row id
    pub fn insert_sms(&self, sms: &NewSms) -> Result<i64> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO sms (thread_id, address, body, date, read, type)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                sms.thread_id,
                sms.address,
                sms.body,
                sms.date_millis,
                sms.read as i64,
                sms.message_box.code(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Query messages with the given selection, ordering and limit.
    ///
    /// Rows that cannot be decoded are skipped with a warning.
    pub fn query_sms(&self, query: &SmsQuery) -> Result<Vec<SmsRow>> {
        let where_clause = match &query.filter {
            SmsFilter::Unread => "WHERE COALESCE(read, 0) = 0",
            SmsFilter::All | SmsFilter::AddressDigits(_) => "",
        };
        let order_clause = match query.order {
            SmsOrder::NewestFirst => "date DESC, _id ASC",
            SmsOrder::ByThreadNewestFirst => "thread_id ASC, date DESC, _id ASC",
        };
        // Address matching happens on normalized digits below, so the limit
        // has to wait until after it.
        let sql_limit = match (&query.filter, query.limit) {
            (SmsFilter::AddressDigits(_), _) | (_, None) => -1,
            (_, Some(limit)) => limit as i64,
        };

        let sql = format!(
            "SELECT _id, thread_id, address, body, date, read, type FROM sms {} ORDER BY {} LIMIT ?1",
            where_clause, order_clause
        );

        let mut rows = Vec::new();
        {
            let conn = self.connection();
            let mut stmt = conn.prepare(&sql)?;
            let mapped = stmt.query_map([sql_limit], Self::row_to_sms)?;
            for row in mapped {
                match row {
                    Ok(row) => rows.push(row),
                    Err(e) => tracing::warn!(error = %e, "Skipping unreadable sms row"),
                }
            }
        }

        if let SmsFilter::AddressDigits(digits) = &query.filter {
            rows.retain(|row| normalize_number(&row.address).contains(digits.as_str()));
            if let Some(limit) = query.limit {
                rows.truncate(limit);
            }
        }

        Ok(rows)
    }

    /// Set the read flag on one message, returning the number of rows matched
    pub fn mark_sms_read(&self, id: &str) -> Result<usize> {
        let Some(rowid) = parse_row_id(id) else {
            return Ok(0);
        };
        let conn = self.connection();
        let changed = conn.execute("UPDATE sms SET read = 1 WHERE _id = ?1", [rowid])?;
        Ok(changed)
    }

    /// Delete one message, returning the number of rows removed
    pub fn delete_sms(&self, id: &str) -> Result<usize> {
        let Some(rowid) = parse_row_id(id) else {
            return Ok(0);
        };
        let conn = self.connection();
        let changed = conn.execute("DELETE FROM sms WHERE _id = ?1", [rowid])?;
        Ok(changed)
    }

    /// Count messages whose read flag is unset
    pub fn count_unread_sms(&self) -> Result<usize> {
        let conn = self.connection();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sms WHERE COALESCE(read, 0) = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn row_to_sms(row: &Row) -> rusqlite::Result<SmsRow> {
        let id: i64 = row.get("_id")?;
        let address: Option<String> = row.get("address")?;
        let body: Option<String> = row.get("body")?;
        let date: Option<i64> = row.get("date")?;
        let read: Option<i64> = row.get("read")?;
        let thread_id: Option<i64> = row.get("thread_id")?;
        let kind: Option<i32> = row.get("type")?;

        Ok(SmsRow {
            id: id.to_string(),
            address: address.unwrap_or_default(),
            body: body.unwrap_or_default(),
            date_millis: date.unwrap_or_else(|| Utc::now().timestamp_millis()),
            read: read.map(|r| r != 0).unwrap_or(false),
            thread_id: thread_id.unwrap_or(0),
            // Missing type means a received message; unknown codes are unspecified
            message_box: kind
                .map(|code| MessageBox::from_code(code).unwrap_or(MessageBox::All))
                .unwrap_or(MessageBox::Inbox),
        })
    }

    // ============================================
    // Contact directory operations
    // ============================================

    /// Insert or update a contact entry
    pub fn upsert_contact(&self, number: &str, display_name: Option<&str>) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO contacts (number, normalized, display_name)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(number) DO UPDATE SET
                normalized = excluded.normalized,
                display_name = excluded.display_name
            "#,
            params![number, normalize_number(number), display_name],
        )?;
        Ok(())
    }

    /// Look up the display name for a number.
    ///
    /// Matches the exact stored number first, then any entry with the same
    /// digits (so `+98 912-000` finds `+98912000`).
    pub fn lookup_contact(&self, number: &str) -> Result<Option<String>> {
        let conn = self.connection();
        let exact: Option<Option<String>> = conn
            .query_row(
                "SELECT display_name FROM contacts WHERE number = ?1",
                [number],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(name) = exact {
            return Ok(name);
        }

        let digits = normalize_number(number);
        if digits.is_empty() {
            return Ok(None);
        }
        let by_digits: Option<Option<String>> = conn
            .query_row(
                "SELECT display_name FROM contacts WHERE normalized = ?1 ORDER BY number LIMIT 1",
                [digits],
                |row| row.get(0),
            )
            .optional()?;
        Ok(by_digits.flatten())
    }

    // ============================================
    // Ambient signal operations
    // ============================================

    /// Record the current Wi-Fi SSID as reported by the platform (None when disconnected)
    pub fn set_wifi_ssid(&self, ssid: Option<&str>) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO wifi_state (id, ssid, updated_at)
            VALUES (1, ?1, ?2)
            ON CONFLICT(id) DO UPDATE SET
                ssid = excluded.ssid,
                updated_at = excluded.updated_at
            "#,
            params![ssid, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Raw SSID last recorded by the platform
    pub fn wifi_ssid(&self) -> Result<Option<String>> {
        let conn = self.connection();
        let ssid: Option<Option<String>> = conn
            .query_row("SELECT ssid FROM wifi_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(ssid.flatten())
    }

    /// Replace the last-known fix for a provider
    pub fn record_location_fix(&self, provider: LocationProvider, fix: &Location) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO location_fixes (provider, latitude, longitude, acquired_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(provider) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                acquired_at = excluded.acquired_at
            "#,
            params![
                provider.as_str(),
                fix.latitude,
                fix.longitude,
                fix.acquired_at_millis
            ],
        )?;
        Ok(())
    }

    /// Last-known fix for a provider
    pub fn location_fix(&self, provider: LocationProvider) -> Result<Option<Location>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT latitude, longitude, acquired_at FROM location_fixes WHERE provider = ?1",
            [provider.as_str()],
            |row| {
                Ok(Location {
                    latitude: row.get(0)?,
                    longitude: row.get(1)?,
                    acquired_at_millis: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}

impl KvStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.connection();
        conn.query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connection();
        conn.execute(
            r#"
            INSERT INTO preferences (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

/// Message ids are the string form of the row id; anything else addresses nothing
fn parse_row_id(id: &str) -> Option<i64> {
    id.trim().parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn test_sms_insert_and_query_order() {
        let db = test_db();
        db.insert_sms(&NewSms::incoming("+100", "old", 1_000, 1))
            .unwrap();
        db.insert_sms(&NewSms::incoming("+200", "new", 3_000, 2))
            .unwrap();
        db.insert_sms(&NewSms::incoming("+100", "mid", 2_000, 1))
            .unwrap();

        let newest = db
            .query_sms(&SmsQuery::newest(SmsFilter::All, None))
            .unwrap();
        let bodies: Vec<_> = newest.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, ["new", "mid", "old"]);

        let by_thread = db.query_sms(&SmsQuery::by_thread()).unwrap();
        let bodies: Vec<_> = by_thread.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, ["mid", "old", "new"]);
    }

    #[test]
    fn test_query_limit_and_unread_filter() {
        let db = test_db();
        for i in 0..4 {
            let mut sms = NewSms::incoming("+1", &format!("m{}", i), i * 10, 1);
            sms.read = i % 2 == 0;
            db.insert_sms(&sms).unwrap();
        }

        let unread = db
            .query_sms(&SmsQuery::newest(SmsFilter::Unread, Some(10)))
            .unwrap();
        let bodies: Vec<_> = unread.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, ["m3", "m1"]);

        let limited = db
            .query_sms(&SmsQuery::newest(SmsFilter::All, Some(1)))
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].body, "m3");

        assert_eq!(db.count_unread_sms().unwrap(), 2);
    }

    #[test]
    fn test_address_digits_filter() {
        let db = test_db();
        db.insert_sms(&NewSms::incoming("+98 (912) 111-2233", "a", 1, 1))
            .unwrap();
        db.insert_sms(&NewSms::incoming("+98 935 000 0000", "b", 2, 2))
            .unwrap();

        let rows = db
            .query_sms(&SmsQuery::newest(
                SmsFilter::AddressDigits("9121112233".to_string()),
                None,
            ))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].body, "a");
    }

    #[test]
    fn test_missing_columns_use_defaults() {
        let db = test_db();
        db.connection()
            .execute("INSERT INTO sms (_id) VALUES (9)", [])
            .unwrap();

        let rows = db
            .query_sms(&SmsQuery::newest(SmsFilter::All, None))
            .unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.id, "9");
        assert_eq!(row.address, "");
        assert_eq!(row.thread_id, 0);
        assert!(!row.read);
        assert_eq!(row.message_box, MessageBox::Inbox);
        assert!(row.date_millis > 0);
    }

    #[test]
    fn test_mark_read_and_delete() {
        let db = test_db();
        let id = db
            .insert_sms(&NewSms::incoming("+1", "hello", 5, 1))
            .unwrap()
            .to_string();

        assert_eq!(db.mark_sms_read(&id).unwrap(), 1);
        // Already read: still matches the row
        assert_eq!(db.mark_sms_read(&id).unwrap(), 1);
        assert_eq!(db.count_unread_sms().unwrap(), 0);

        assert_eq!(db.delete_sms(&id).unwrap(), 1);
        assert_eq!(db.delete_sms(&id).unwrap(), 0);
        assert_eq!(db.delete_sms("not-a-row").unwrap(), 0);
        assert_eq!(db.mark_sms_read("").unwrap(), 0);
    }

    #[test]
    fn test_contact_lookup() {
        let db = test_db();
        db.upsert_contact("+989121112233", Some("Sara")).unwrap();
        db.upsert_contact("Irancell", Some("Carrier")).unwrap();

        assert_eq!(
            db.lookup_contact("+989121112233").unwrap().as_deref(),
            Some("Sara")
        );
        assert_eq!(
            db.lookup_contact("+98 912 111 2233").unwrap().as_deref(),
            Some("Sara")
        );
        assert_eq!(
            db.lookup_contact("Irancell").unwrap().as_deref(),
            Some("Carrier")
        );
        assert_eq!(db.lookup_contact("+1555").unwrap(), None);
        assert_eq!(db.lookup_contact("Unknown").unwrap(), None);
    }

    #[test]
    fn test_wifi_and_location_state() {
        let db = test_db();
        assert_eq!(db.wifi_ssid().unwrap(), None);
        db.set_wifi_ssid(Some("\"HomeNet\"")).unwrap();
        assert_eq!(db.wifi_ssid().unwrap().as_deref(), Some("\"HomeNet\""));
        db.set_wifi_ssid(None).unwrap();
        assert_eq!(db.wifi_ssid().unwrap(), None);

        assert_eq!(db.location_fix(LocationProvider::Gps).unwrap(), None);
        let fix = Location {
            latitude: 35.7,
            longitude: 51.4,
            acquired_at_millis: 1_000,
        };
        db.record_location_fix(LocationProvider::Gps, &fix).unwrap();
        assert_eq!(db.location_fix(LocationProvider::Gps).unwrap(), Some(fix));
        assert_eq!(db.location_fix(LocationProvider::Network).unwrap(), None);
    }

    #[test]
    fn test_preferences_kv() {
        let db = test_db();
        assert_eq!(db.get("k").unwrap(), None);
        db.set("k", "v1").unwrap();
        db.set("k", "v2").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("v2"));
    }
}
