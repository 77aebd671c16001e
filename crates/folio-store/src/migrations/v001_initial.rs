//! v001 -- Initial schema creation.
//!
//! Creates the `nodes` table holding every leaf of the content tree and the
//! `preferences` key/value table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Content tree leaves
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS nodes (
    path       TEXT PRIMARY KEY NOT NULL,   -- full '/'-joined key path
    value      TEXT NOT NULL,               -- JSON scalar or array
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

-- ----------------------------------------------------------------
-- Site preferences
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS preferences (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
