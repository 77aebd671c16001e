//! v002 -- Preferences keyed per client.
//!
//! Theme color and the welcome flag belong to a single browser, so the
//! site-wide `preferences` table is replaced by one keyed on a client id.

use rusqlite::Connection;

/// SQL executed when upgrading from version 1 to version 2.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS client_preferences (
    client_id TEXT NOT NULL,
    key       TEXT NOT NULL,
    value     TEXT NOT NULL,
    PRIMARY KEY (client_id, key)
);

DROP TABLE IF EXISTS preferences;
"#;

/// Apply the per-client preferences migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
