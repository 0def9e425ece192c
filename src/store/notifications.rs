use chrono::{DateTime, Duration, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::models::notification::{Notification, NotificationStatus};

use super::{dt, dt_opt, ts};

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let status: String = row.get(5)?;
    Ok(Notification {
        id: row.get(0)?,
        account_id: row.get(1)?,
        meeting_id: row.get(2)?,
        scheduled_at: dt(row.get(3)?),
        sent_at: dt_opt(row.get(4)?),
        status: NotificationStatus::parse(&status).unwrap_or(NotificationStatus::Pending),
        channel: row.get(6)?,
    })
}

const NOTIFICATION_COLUMNS: &str =
    "id, account_id, meeting_id, scheduled_at, sent_at, status, channel";

/// Inserts a pending reminder unless one already exists for the same
/// (meeting_id, scheduled_at) pair. Returns whether a row was inserted.
/// This is the dedup point that makes repeated sync runs idempotent; the
/// schema-level UNIQUE constraint backs it across crashes.
pub fn ensure_scheduled(
    conn: &Connection,
    account_id: i64,
    meeting_id: i64,
    scheduled_at: DateTime<Utc>,
    channel: &str,
) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT INTO notifications (account_id, meeting_id, scheduled_at, status, channel)
         VALUES (?1, ?2, ?3, 'pending', ?4)
         ON CONFLICT (meeting_id, scheduled_at) DO NOTHING",
        params![account_id, meeting_id, ts(scheduled_at), channel],
    )?;
    Ok(inserted > 0)
}

/// One due reminder joined with the delivery context the dispatcher needs.
#[derive(Debug, Clone)]
pub struct DueReminder {
    pub id: i64,
    pub account_id: i64,
    pub meeting_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    /// Messaging identity of the owning account; None means unreachable.
    pub recipient: Option<String>,
    pub title: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
}

/// Due, unsent reminders in ascending fire-time order, at most `limit` rows.
pub fn due_batch(
    conn: &Connection,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<DueReminder>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT n.id, n.account_id, n.meeting_id, n.scheduled_at,
                a.discord_user_id, m.title, m.start_at
         FROM notifications n
         JOIN accounts a ON a.id = n.account_id
         LEFT JOIN meetings m ON m.id = n.meeting_id
         WHERE n.scheduled_at <= ?1 AND n.sent_at IS NULL
         ORDER BY n.scheduled_at ASC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![ts(now), limit], |row| {
        Ok(DueReminder {
            id: row.get(0)?,
            account_id: row.get(1)?,
            meeting_id: row.get(2)?,
            scheduled_at: dt(row.get(3)?),
            recipient: row.get(4)?,
            title: row.get(5)?,
            start_at: dt_opt(row.get(6)?),
        })
    })?;
    let mut due = Vec::new();
    for row in rows {
        due.push(row?);
    }
    Ok(due)
}

/// Stamps `sent_at` on delivered reminders. Callers wrap this in the batch
/// transaction so a crash mid-batch redelivers rather than loses.
pub fn mark_sent(conn: &Connection, ids: &[i64], now: DateTime<Utc>) -> Result<(), StoreError> {
    let mut stmt = conn.prepare("UPDATE notifications SET sent_at = ?1 WHERE id = ?2")?;
    for id in ids {
        stmt.execute(params![ts(now), id])?;
    }
    Ok(())
}

/// Shifts the fire time forward by `minutes` and clears `sent_at`, re-arming
/// the reminder for a future dispatch pass.
pub fn snooze(
    conn: &mut Connection,
    id: i64,
    minutes: i64,
) -> Result<Notification, StoreError> {
    let tx = conn.transaction()?;
    let scheduled_at: Option<i64> = tx
        .query_row(
            "SELECT scheduled_at FROM notifications WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let scheduled_at = scheduled_at.ok_or(StoreError::NotFound("notification"))?;
    let shifted = dt(scheduled_at) + Duration::minutes(minutes);
    tx.execute(
        "UPDATE notifications SET scheduled_at = ?1, sent_at = NULL, status = 'pending'
         WHERE id = ?2",
        params![ts(shifted), id],
    )?;
    let updated = get_in(&tx, id)?;
    tx.commit()?;
    Ok(updated)
}

/// User-initiated early close: marks the reminder acknowledged and stamps
/// `sent_at` if delivery never happened.
pub fn acknowledge(
    conn: &Connection,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Notification, StoreError> {
    let changed = conn.execute(
        "UPDATE notifications SET status = 'acknowledged',
             sent_at = COALESCE(sent_at, ?1)
         WHERE id = ?2",
        params![ts(now), id],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound("notification"));
    }
    get_in(conn, id)
}

fn get_in(conn: &Connection, id: i64) -> Result<Notification, StoreError> {
    conn.query_row(
        &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
        params![id],
        row_to_notification,
    )
    .optional()?
    .ok_or(StoreError::NotFound("notification"))
}

pub fn get(conn: &Connection, id: i64) -> Result<Notification, StoreError> {
    get_in(conn, id)
}

/// All reminders for one meeting, ascending by fire time.
pub fn for_meeting(conn: &Connection, meeting_id: i64) -> Result<Vec<Notification>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE meeting_id = ?1 ORDER BY scheduled_at ASC"
    ))?;
    let rows = stmt.query_map(params![meeting_id], row_to_notification)?;
    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn count(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM notifications", [], |row| row.get(0))?)
}
