use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::calendar::CalendarProvider;
use crate::error::{StoreError, SyncError};
use crate::models::account::LinkedAccount;
use crate::models::notification::DELIVERY_CHANNEL;
use crate::store;
use crate::store::meetings::MeetingUpsert;

pub const DEFAULT_WINDOW_DAYS: i64 = 14;
const LOOKBACK_DAYS: i64 = 1;

/// Fixed reminder policy: one reminder a day before the meeting, one an
/// hour before.
pub fn reminder_offsets() -> [Duration; 2] {
    [Duration::days(1), Duration::hours(1)]
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub accounts_synced: usize,
    pub accounts_failed: usize,
    pub events_seen: usize,
}

/// One reconciliation pass over every linked account. A provider or store
/// failure for one account is logged and counted, never propagated; the
/// remaining accounts still sync in the same pass.
pub async fn sync_all_accounts(
    conn: &mut Connection,
    provider: &dyn CalendarProvider,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<SyncOutcome, StoreError> {
    let accounts = store::accounts::linked_accounts(conn)?;
    let mut outcome = SyncOutcome::default();
    for linked in &accounts {
        match sync_account(conn, provider, linked, now, window_days).await {
            Ok(events_seen) => {
                outcome.accounts_synced += 1;
                outcome.events_seen += events_seen;
            }
            Err(err) => {
                warn!(account_id = linked.account.id, error = %err, "account sync failed");
                outcome.accounts_failed += 1;
            }
        }
    }
    Ok(outcome)
}

/// Reconciles one account: fetches provider events for the rolling window
/// `[now - 1 day, now + window_days]`, upserts each as a meeting keyed by
/// (account_id, external_id), and ensures the policy reminders exist for
/// each meeting. All writes land in one transaction so the dispatcher never
/// observes a half-applied account.
pub async fn sync_account(
    conn: &mut Connection,
    provider: &dyn CalendarProvider,
    linked: &LinkedAccount,
    now: DateTime<Utc>,
    window_days: i64,
) -> Result<usize, SyncError> {
    let time_min = now - Duration::days(LOOKBACK_DAYS);
    let time_max = now + Duration::days(window_days);

    // The provider call happens before the transaction opens; only store
    // writes run inside it.
    let events = provider.get_events(linked, time_min, time_max).await?;
    debug!(
        account_id = linked.account.id,
        events = events.len(),
        "fetched calendar window"
    );

    let tx = conn.transaction().map_err(StoreError::from)?;
    for event in &events {
        let meeting_id = store::meetings::upsert(
            &tx,
            linked.account.id,
            &event.external_id,
            &MeetingUpsert {
                title: event.title.as_deref(),
                start_at: Some(event.start_at),
                end_at: event.end_at,
                location: event.location.as_deref(),
                description: event.description.as_deref(),
            },
            now,
        )?;

        for offset in reminder_offsets() {
            let fire_at = event.start_at - offset;
            // Never create a reminder for a moment already passed; a newly
            // synced near-past event must not flood the dispatcher.
            if fire_at <= now {
                continue;
            }
            store::notifications::ensure_scheduled(
                &tx,
                linked.account.id,
                meeting_id,
                fire_at,
                DELIVERY_CHANNEL,
            )?;
        }
    }
    tx.commit().map_err(StoreError::from)?;
    Ok(events.len())
}
