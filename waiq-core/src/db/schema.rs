//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: message store, contact directory, key-value store
    r#"
    -- ============================================
    -- Device tables (owned by the platform)
    -- ============================================

    -- Columns are nullable on purpose: platform rows may omit any of them.
    CREATE TABLE IF NOT EXISTS sms (
        _id              INTEGER PRIMARY KEY AUTOINCREMENT,
        thread_id        INTEGER,
        address          TEXT,
        body             TEXT,
        date             INTEGER,
        read             INTEGER DEFAULT 0,
        type             INTEGER
    );

    CREATE TABLE IF NOT EXISTS contacts (
        number           TEXT PRIMARY KEY,
        normalized       TEXT NOT NULL,
        display_name     TEXT
    );

    -- ============================================
    -- Engine state (owned by waiq)
    -- ============================================

    CREATE TABLE IF NOT EXISTS preferences (
        key              TEXT PRIMARY KEY,
        value            TEXT NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    -- ============================================
    -- Indexes
    -- ============================================

    CREATE INDEX IF NOT EXISTS idx_sms_date ON sms(date DESC);
    CREATE INDEX IF NOT EXISTS idx_sms_thread_date ON sms(thread_id, date DESC);
    CREATE INDEX IF NOT EXISTS idx_sms_read ON sms(read);
    CREATE INDEX IF NOT EXISTS idx_contacts_normalized ON contacts(normalized);
    "#,
    // Version 2: ambient signal tables
    r#"
    CREATE TABLE IF NOT EXISTS location_fixes (
        provider         TEXT PRIMARY KEY,
        latitude         REAL NOT NULL,
        longitude        REAL NOT NULL,
        acquired_at      INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS wifi_state (
        id               INTEGER PRIMARY KEY CHECK (id = 1),
        ssid             TEXT,
        updated_at       DATETIME NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
