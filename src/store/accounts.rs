use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::StoreError;
use crate::models::account::{Account, LinkedAccount};

use super::ts_opt;

fn row_to_account(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        discord_user_id: row.get(1)?,
        timezone: row.get(2)?,
    })
}

pub fn create(
    conn: &Connection,
    discord_user_id: Option<&str>,
    timezone: Option<&str>,
) -> Result<Account, StoreError> {
    conn.execute(
        "INSERT INTO accounts (discord_user_id, timezone) VALUES (?1, ?2)",
        params![discord_user_id, timezone],
    )?;
    get(conn, conn.last_insert_rowid())
}

/// Returns the account for a Discord user, creating it on first contact.
pub fn ensure_account(conn: &Connection, discord_user_id: &str) -> Result<Account, StoreError> {
    if let Some(account) = get_by_discord_id(conn, discord_user_id)? {
        return Ok(account);
    }
    create(conn, Some(discord_user_id), None)
}

pub fn get(conn: &Connection, id: i64) -> Result<Account, StoreError> {
    conn.query_row(
        "SELECT id, discord_user_id, timezone FROM accounts WHERE id = ?1",
        params![id],
        row_to_account,
    )
    .optional()?
    .ok_or(StoreError::NotFound("account"))
}

pub fn get_by_discord_id(
    conn: &Connection,
    discord_user_id: &str,
) -> Result<Option<Account>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, discord_user_id, timezone FROM accounts WHERE discord_user_id = ?1",
            params![discord_user_id],
            row_to_account,
        )
        .optional()?)
}

/// Stores or replaces the calendar credentials for an account. Seeded by the
/// external OAuth flow; the core only reads these rows back.
pub fn link_calendar(
    conn: &Connection,
    account_id: i64,
    provider: &str,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO oauth_tokens (account_id, provider, access_token, refresh_token, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT (account_id, provider) DO UPDATE SET
             access_token = excluded.access_token,
             refresh_token = excluded.refresh_token,
             expires_at = excluded.expires_at",
        params![account_id, provider, access_token, refresh_token, ts_opt(expires_at)],
    )?;
    Ok(())
}

/// Accounts eligible for calendar sync: those with stored credentials.
pub fn linked_accounts(conn: &Connection) -> Result<Vec<LinkedAccount>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.discord_user_id, a.timezone, t.access_token
         FROM accounts a
         JOIN oauth_tokens t ON t.account_id = a.id
         WHERE t.provider = 'google'
         ORDER BY a.id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(LinkedAccount {
            account: Account {
                id: row.get(0)?,
                discord_user_id: row.get(1)?,
                timezone: row.get(2)?,
            },
            access_token: row.get(3)?,
        })
    })?;
    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(row?);
    }
    Ok(accounts)
}

pub fn linked_account(
    conn: &Connection,
    account_id: i64,
) -> Result<Option<LinkedAccount>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT a.id, a.discord_user_id, a.timezone, t.access_token
             FROM accounts a
             JOIN oauth_tokens t ON t.account_id = a.id
             WHERE t.provider = 'google' AND a.id = ?1",
            params![account_id],
            |row| {
                Ok(LinkedAccount {
                    account: Account {
                        id: row.get(0)?,
                        discord_user_id: row.get(1)?,
                        timezone: row.get(2)?,
                    },
                    access_token: row.get(3)?,
                })
            },
        )
        .optional()?)
}
