use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;

use crate::error::StoreError;

pub mod accounts;
pub mod meetings;
pub mod notifications;
pub mod schema;

/// Opens (or creates) the database file and brings the schema up.
pub fn open(db_path: &str) -> Result<Connection, StoreError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|_| StoreError::NotFound("database directory"))?;
        }
    }
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init(&conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, for tests and throwaway runs.
pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    schema::init(&conn)?;
    Ok(conn)
}

// Timestamps are stored as unix seconds. Calendar data has no use for
// sub-second precision and integer comparisons keep the due-time predicate
// and the (meeting_id, scheduled_at) dedup key exact.

pub(crate) fn ts(value: DateTime<Utc>) -> i64 {
    value.timestamp()
}

pub(crate) fn ts_opt(value: Option<DateTime<Utc>>) -> Option<i64> {
    value.map(ts)
}

pub(crate) fn dt(value: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(value, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn dt_opt(value: Option<i64>) -> Option<DateTime<Utc>> {
    value.map(dt)
}
