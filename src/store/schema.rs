use rusqlite::Connection;

use crate::error::StoreError;

/// Creates all tables and the uniqueness constraints the sync and dispatch
/// invariants rely on. Idempotent; runs at every startup.
pub fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS accounts (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            discord_user_id  TEXT UNIQUE,
            timezone         TEXT
        );

        CREATE TABLE IF NOT EXISTS oauth_tokens (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id    INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            provider      TEXT NOT NULL,
            access_token  TEXT NOT NULL,
            refresh_token TEXT,
            expires_at    INTEGER,
            UNIQUE (account_id, provider)
        );

        CREATE TABLE IF NOT EXISTS meetings (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id  INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            title       TEXT,
            start_at    INTEGER,
            end_at      INTEGER,
            location    TEXT,
            description TEXT,
            external_id TEXT,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            UNIQUE (account_id, external_id)
        );

        CREATE TABLE IF NOT EXISTS notifications (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id   INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
            meeting_id   INTEGER REFERENCES meetings(id) ON DELETE CASCADE,
            scheduled_at INTEGER NOT NULL,
            sent_at      INTEGER,
            status       TEXT NOT NULL DEFAULT 'pending',
            channel      TEXT,
            UNIQUE (meeting_id, scheduled_at)
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_due
            ON notifications (scheduled_at) WHERE sent_at IS NULL;",
    )?;
    Ok(())
}
