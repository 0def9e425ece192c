use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serenity::all::{CreateActionRow, CreateButton, CreateMessage, Http, UserId};
use serenity::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, info, warn};

use crate::error::{ChannelError, StoreError};
use crate::handlers::action::CallbackAction;
use crate::store;
use crate::store::notifications::DueReminder;

pub const DEFAULT_BATCH_LIMIT: i64 = 20;
pub const SNOOZE_MINUTES: i64 = 15;

/// A button attached to an outgoing reminder.
pub struct MessageAction {
    pub label: String,
    pub action: CallbackAction,
}

/// Delivery boundary for reminders. The dispatcher only knows recipients as
/// opaque channel identities.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        actions: &[MessageAction],
    ) -> Result<(), ChannelError>;
}

/// Delivers reminders as Discord DMs with action buttons.
pub struct DiscordChannel {
    http: Http,
}

impl DiscordChannel {
    pub fn new(token: &str) -> Self {
        DiscordChannel {
            http: Http::new(token),
        }
    }
}

#[async_trait]
impl NotificationChannel for DiscordChannel {
    async fn send(
        &self,
        recipient: &str,
        text: &str,
        actions: &[MessageAction],
    ) -> Result<(), ChannelError> {
        let user_id: u64 = recipient
            .parse()
            .map_err(|_| ChannelError(format!("Invalid Discord user id: {}", recipient)))?;
        let dm = UserId::new(user_id)
            .create_dm_channel(&self.http)
            .await
            .map_err(|e| ChannelError(format!("Failed to open DM channel: {}", e)))?;

        let buttons: Vec<CreateButton> = actions
            .iter()
            .map(|a| CreateButton::new(a.action.encode()).label(a.label.clone()))
            .collect();
        let mut message = CreateMessage::new().content(text);
        if !buttons.is_empty() {
            message = message.components(vec![CreateActionRow::Buttons(buttons)]);
        }

        dm.id
            .send_message(&self.http, message)
            .await
            .map_err(|e| ChannelError(format!("Failed to send DM: {}", e)))?;
        Ok(())
    }
}

pub fn reminder_message(reminder: &DueReminder) -> String {
    let title = reminder.title.as_deref().unwrap_or("(untitled)");
    let starts = match reminder.start_at {
        Some(start) => start.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "?".to_string(),
    };
    format!("Reminder: {}\nStarts: {}", title, starts)
}

pub fn reminder_actions(notification_id: i64) -> Vec<MessageAction> {
    vec![
        MessageAction {
            label: format!("Snooze {} min", SNOOZE_MINUTES),
            action: CallbackAction::Snooze {
                notification_id,
                minutes: SNOOZE_MINUTES,
            },
        },
        MessageAction {
            label: "Ok".to_string(),
            action: CallbackAction::Acknowledge { notification_id },
        },
    ]
}

/// One dispatcher pass: pulls the oldest due reminders, sends each, and
/// marks only the delivered ones as sent in a single transaction. A failed
/// send leaves its row pending for the next pass; a recipient with no
/// Discord identity is skipped without being marked.
pub async fn dispatch_tick(
    conn: &mut Connection,
    channel: &dyn NotificationChannel,
    now: DateTime<Utc>,
    batch_limit: i64,
) -> Result<usize, StoreError> {
    let due = store::notifications::due_batch(conn, now, batch_limit)?;
    if due.is_empty() {
        return Ok(0);
    }

    let mut delivered: Vec<i64> = Vec::new();
    for reminder in &due {
        let recipient = match reminder.recipient.as_deref() {
            Some(r) => r,
            None => {
                debug!(
                    notification_id = reminder.id,
                    "skipping reminder for account without a Discord identity"
                );
                continue;
            }
        };
        let text = reminder_message(reminder);
        let actions = reminder_actions(reminder.id);
        match channel.send(recipient, &text, &actions).await {
            Ok(()) => delivered.push(reminder.id),
            Err(err) => {
                warn!(notification_id = reminder.id, error = %err, "reminder delivery failed");
            }
        }
    }

    if !delivered.is_empty() {
        let tx = conn.transaction()?;
        store::notifications::mark_sent(&tx, &delivered, now)?;
        tx.commit()?;
    }
    Ok(delivered.len())
}

/// Periodic reminder dispatch over Discord DMs.
pub async fn run_notification_loop(
    db: Arc<Mutex<Connection>>,
    token: Arc<String>,
    interval_secs: u64,
    batch_limit: i64,
) {
    let channel = DiscordChannel::new(&token);
    loop {
        sleep(Duration::from_secs(interval_secs)).await;
        let mut conn = db.lock().await;
        match dispatch_tick(&mut conn, &channel, Utc::now(), batch_limit).await {
            Ok(0) => {}
            Ok(sent) => {
                info!(sent, "dispatched reminders");
            }
            Err(err) => {
                error!(error = %err, "reminder dispatch pass failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reminder_message_formats_title_and_start() {
        let reminder = DueReminder {
            id: 1,
            account_id: 1,
            meeting_id: Some(2),
            scheduled_at: Utc.with_ymd_and_hms(2025, 8, 31, 10, 0, 0).unwrap(),
            recipient: Some("42".to_string()),
            title: Some("Planning".to_string()),
            start_at: Some(Utc.with_ymd_and_hms(2025, 9, 1, 10, 0, 0).unwrap()),
        };
        assert_eq!(
            reminder_message(&reminder),
            "Reminder: Planning\nStarts: 2025-09-01 10:00 UTC"
        );
    }

    #[test]
    fn reminder_message_tolerates_missing_meeting() {
        let reminder = DueReminder {
            id: 1,
            account_id: 1,
            meeting_id: None,
            scheduled_at: Utc.with_ymd_and_hms(2025, 8, 31, 10, 0, 0).unwrap(),
            recipient: None,
            title: None,
            start_at: None,
        };
        assert_eq!(reminder_message(&reminder), "Reminder: (untitled)\nStarts: ?");
    }

    #[test]
    fn reminder_actions_carry_snooze_and_ack() {
        let actions = reminder_actions(9);
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action.encode(), "snooze:9:15");
        assert_eq!(actions[1].action.encode(), "ack:9");
    }
}
