use chrono::{DateTime, Utc};

/// A reconciled copy of one external calendar event, local to an account.
/// At most one row exists per (account_id, external_id) pair; the sync pass
/// and the confirm-meeting flow both write through the same upsert.
#[derive(Debug, Clone)]
pub struct Meeting {
    pub id: i64,
    pub account_id: i64,
    pub title: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
