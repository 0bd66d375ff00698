//! Key/value repository for the `sync_state` table.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::DatabaseError;

pub const KEY_WATERMARK: &str = "watermark";
pub const KEY_LAST_SYNC_AT: &str = "last_sync_at";
pub const KEY_LAST_SYNC_OK: &str = "last_sync_ok";
pub const KEY_LAST_SYNC_SUMMARY: &str = "last_sync_summary";

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    let value = conn
        .query_row(
            "SELECT value FROM sync_state WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO sync_state (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}
