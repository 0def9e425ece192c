#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use serenity::async_trait;
use tokio::sync::Mutex;

use meetBot::calendar::{CalendarEvent, CalendarProvider};
use meetBot::error::{ChannelError, ProviderError};
use meetBot::models::account::LinkedAccount;
use meetBot::store;
use meetBot::tasks::notification_loop::{MessageAction, NotificationChannel};

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Creates an account with a stored calendar credential and returns its id.
pub fn seed_linked_account(conn: &Connection, discord_user_id: Option<&str>) -> i64 {
    let account = store::accounts::create(conn, discord_user_id, None).unwrap();
    store::accounts::link_calendar(conn, account.id, "google", "token", None, None).unwrap();
    account.id
}

pub fn event(external_id: &str, title: &str, start_at: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        external_id: external_id.to_string(),
        title: Some(title.to_string()),
        start_at,
        end_at: Some(start_at + chrono::Duration::minutes(30)),
        location: None,
        description: None,
    }
}

/// Calendar provider replaying canned events per account, with optional
/// scripted failures.
#[derive(Default)]
pub struct ScriptedProvider {
    events: HashMap<i64, Vec<CalendarEvent>>,
    fail_accounts: HashSet<i64>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, account_id: i64, events: Vec<CalendarEvent>) -> Self {
        self.events.insert(account_id, events);
        self
    }

    pub fn failing_for(mut self, account_id: i64) -> Self {
        self.fail_accounts.insert(account_id);
        self
    }
}

#[async_trait]
impl CalendarProvider for ScriptedProvider {
    async fn get_events(
        &self,
        account: &LinkedAccount,
        _time_min: DateTime<Utc>,
        _time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, ProviderError> {
        if self.fail_accounts.contains(&account.account.id) {
            return Err(ProviderError::Network("scripted failure".to_string()));
        }
        Ok(self
            .events
            .get(&account.account.id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_event(
        &self,
        _account: &LinkedAccount,
        _title: &str,
        _start_at: DateTime<Utc>,
        _end_at: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        Ok("scripted-created-1".to_string())
    }
}

/// Notification channel that records every send and can fail on chosen
/// recipients.
#[derive(Default)]
pub struct MockChannel {
    pub sent: Mutex<Vec<(String, String)>>,
    fail_recipients: HashSet<String>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, recipient: &str) -> Self {
        self.fail_recipients.insert(recipient.to_string());
        self
    }

    pub async fn sent_recipients(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(r, _)| r.clone()).collect()
    }
}

#[async_trait]
impl NotificationChannel for MockChannel {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        _actions: &[MessageAction],
    ) -> Result<(), ChannelError> {
        if self.fail_recipients.contains(recipient) {
            return Err(ChannelError("scripted send failure".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}
