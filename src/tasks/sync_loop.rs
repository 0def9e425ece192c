use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{error, info};

use crate::calendar::CalendarProvider;
use crate::service::sync_service;

/// Periodic calendar reconciliation. Each pass locks the store, syncs every
/// linked account, and releases the lock before sleeping again.
pub async fn run_sync_loop(
    db: Arc<Mutex<Connection>>,
    provider: Arc<dyn CalendarProvider>,
    interval_secs: u64,
    window_days: i64,
) {
    loop {
        sleep(Duration::from_secs(interval_secs)).await;
        let mut conn = db.lock().await;
        match sync_service::sync_all_accounts(&mut conn, provider.as_ref(), Utc::now(), window_days)
            .await
        {
            Ok(outcome) => {
                info!(
                    accounts_synced = outcome.accounts_synced,
                    accounts_failed = outcome.accounts_failed,
                    events_seen = outcome.events_seen,
                    "calendar sync pass finished"
                );
            }
            Err(err) => {
                error!(error = %err, "calendar sync pass failed");
            }
        }
    }
}
