//! Database schema definitions
//!
//! This module contains the SQL schema for the SQLite key-value backend.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Key-value entries with optional expiry (RFC 3339, UTC)
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expires_at TEXT,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_kv_expires ON kv(expires_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
