//! v002 -- Client-side Local Durable Store.
//!
//! Holds the last known server state of each contact plus provisional
//! records (temporary ids) that still wait for their first sync.

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS contact_cache (
    id         TEXT PRIMARY KEY NOT NULL,   -- server id or tmp-<uuid>
    name       TEXT NOT NULL,
    email      TEXT NOT NULL,
    phone      TEXT NOT NULL,
    created_at TEXT,                        -- NULL for provisional records
    updated_at TEXT
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
