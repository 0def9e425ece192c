use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::models::meeting::Meeting;

use super::{dt, dt_opt, ts, ts_opt};

/// Mutable fields written on every upsert. The natural key
/// (account_id, external_id) is passed separately.
#[derive(Debug, Default, Clone)]
pub struct MeetingUpsert<'a> {
    pub title: Option<&'a str>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
}

fn row_to_meeting(row: &Row) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        account_id: row.get(1)?,
        title: row.get(2)?,
        start_at: dt_opt(row.get(3)?),
        end_at: dt_opt(row.get(4)?),
        location: row.get(5)?,
        description: row.get(6)?,
        external_id: row.get(7)?,
        created_at: dt(row.get(8)?),
        updated_at: dt(row.get(9)?),
    })
}

const MEETING_COLUMNS: &str =
    "id, account_id, title, start_at, end_at, location, description, external_id, \
     created_at, updated_at";

/// Insert-or-update keyed by (account_id, external_id). Running it twice
/// with the same input leaves exactly one row with the latest fields.
pub fn upsert(
    conn: &Connection,
    account_id: i64,
    external_id: &str,
    fields: &MeetingUpsert,
    now: DateTime<Utc>,
) -> Result<i64, StoreError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM meetings WHERE account_id = ?1 AND external_id = ?2",
            params![account_id, external_id],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE meetings SET title = ?1, start_at = ?2, end_at = ?3,
                     location = ?4, description = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    fields.title,
                    ts_opt(fields.start_at),
                    ts_opt(fields.end_at),
                    fields.location,
                    fields.description,
                    ts(now),
                    id
                ],
            )?;
            Ok(id)
        }
        None => {
            conn.execute(
                "INSERT INTO meetings (account_id, title, start_at, end_at, location,
                     description, external_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    account_id,
                    fields.title,
                    ts_opt(fields.start_at),
                    ts_opt(fields.end_at),
                    fields.location,
                    fields.description,
                    external_id,
                    ts(now)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

pub fn get(conn: &Connection, id: i64) -> Result<Meeting, StoreError> {
    conn.query_row(
        &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ?1"),
        params![id],
        row_to_meeting,
    )
    .optional()?
    .ok_or(StoreError::NotFound("meeting"))
}

/// Meetings for one account starting within the next `horizon_days`.
pub fn upcoming(
    conn: &Connection,
    account_id: i64,
    now: DateTime<Utc>,
    horizon_days: i64,
) -> Result<Vec<Meeting>, StoreError> {
    let until = now + Duration::days(horizon_days);
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEETING_COLUMNS} FROM meetings
         WHERE account_id = ?1 AND start_at IS NOT NULL
           AND start_at >= ?2 AND start_at <= ?3
         ORDER BY start_at ASC"
    ))?;
    let rows = stmt.query_map(params![account_id, ts(now), ts(until)], row_to_meeting)?;
    let mut meetings = Vec::new();
    for row in rows {
        meetings.push(row?);
    }
    Ok(meetings)
}

pub fn count(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM meetings", [], |row| row.get(0))?)
}
