mod support;

use chrono::Duration;

use meetBot::store;
use meetBot::store::meetings::MeetingUpsert;
use meetBot::tasks::notification_loop::dispatch_tick;

use support::{MockChannel, seed_linked_account, utc};

fn seed_reminder(
    conn: &rusqlite::Connection,
    account_id: i64,
    external_id: &str,
    scheduled_at: chrono::DateTime<chrono::Utc>,
) -> i64 {
    let meeting_id = store::meetings::upsert(
        conn,
        account_id,
        external_id,
        &MeetingUpsert {
            title: Some("Standup"),
            start_at: Some(scheduled_at + Duration::hours(1)),
            ..Default::default()
        },
        scheduled_at,
    )
    .unwrap();
    store::notifications::ensure_scheduled(conn, account_id, meeting_id, scheduled_at, "discord")
        .unwrap();
    let reminders = store::notifications::for_meeting(conn, meeting_id).unwrap();
    reminders.last().unwrap().id
}

#[tokio::test]
async fn due_reminders_go_out_oldest_first() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 31, 12, 0);
    seed_reminder(&conn, account_id, "evt-2", now - Duration::minutes(5));
    seed_reminder(&conn, account_id, "evt-1", now - Duration::minutes(30));
    seed_reminder(&conn, account_id, "evt-3", now - Duration::minutes(1));

    let channel = MockChannel::new();
    let sent = dispatch_tick(&mut conn, &channel, now, 20).await.unwrap();
    assert_eq!(sent, 3);

    // Delivered in ascending fire-time order within the pass; each message
    // names its meeting start (fire time plus an hour).
    let messages = channel.sent.lock().await;
    let texts: Vec<&str> = messages.iter().map(|(_, text)| text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Reminder: Standup\nStarts: 2025-08-31 12:30 UTC",
            "Reminder: Standup\nStarts: 2025-08-31 12:55 UTC",
            "Reminder: Standup\nStarts: 2025-08-31 12:59 UTC",
        ]
    );
    drop(messages);

    let due = store::notifications::due_batch(&conn, now, 20).unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn sent_reminders_are_never_reselected() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 31, 12, 0);
    seed_reminder(&conn, account_id, "evt-1", now - Duration::minutes(5));

    let channel = MockChannel::new();
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 1);
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 0);
    assert_eq!(channel.sent.lock().await.len(), 1);
}

#[tokio::test]
async fn account_without_identity_is_skipped_but_stays_pending() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, None);
    let now = utc(2025, 8, 31, 12, 0);
    let id = seed_reminder(&conn, account_id, "evt-1", now - Duration::minutes(5));

    let channel = MockChannel::new();
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 0);
    assert!(channel.sent.lock().await.is_empty());

    // Not marked sent: it becomes deliverable if the identity appears later.
    let reminder = store::notifications::get(&conn, id).unwrap();
    assert!(reminder.sent_at.is_none());
}

#[tokio::test]
async fn one_failed_send_does_not_block_the_batch() {
    let mut conn = store::open_in_memory().unwrap();
    let flaky = seed_linked_account(&conn, Some("13"));
    let healthy = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 31, 12, 0);
    let flaky_id = seed_reminder(&conn, flaky, "evt-1", now - Duration::minutes(10));
    seed_reminder(&conn, healthy, "evt-2", now - Duration::minutes(5));

    let channel = MockChannel::new().failing_for("13");
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 1);
    assert_eq!(channel.sent_recipients().await, vec!["42".to_string()]);

    // The failed one is still pending and goes out once the channel recovers.
    let reminder = store::notifications::get(&conn, flaky_id).unwrap();
    assert!(reminder.sent_at.is_none());
    let channel = MockChannel::new();
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 1);
}

#[tokio::test]
async fn batch_limit_caps_a_single_pass() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 31, 12, 0);
    for i in 0..5 {
        seed_reminder(
            &conn,
            account_id,
            &format!("evt-{}", i),
            now - Duration::minutes(30 - i),
        );
    }

    let channel = MockChannel::new();
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 2).await.unwrap(), 2);
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 2).await.unwrap(), 2);
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 2).await.unwrap(), 1);
}

#[tokio::test]
async fn nothing_due_is_a_quiet_pass() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 31, 12, 0);
    seed_reminder(&conn, account_id, "evt-1", now + Duration::hours(1));

    let channel = MockChannel::new();
    assert_eq!(dispatch_tick(&mut conn, &channel, now, 20).await.unwrap(), 0);
    assert!(channel.sent.lock().await.is_empty());
}

#[tokio::test]
async fn only_reminders_already_due_are_delivered() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    // Meeting at 2025-09-01 10:00; reminders at 08-31 10:00 and 09-01 09:00.
    seed_reminder(&conn, account_id, "evt-1", utc(2025, 8, 31, 10, 0));
    seed_reminder(&conn, account_id, "evt-1b", utc(2025, 9, 1, 9, 0));

    let channel = MockChannel::new();
    let sent = dispatch_tick(&mut conn, &channel, utc(2025, 8, 31, 10, 0), 20)
        .await
        .unwrap();
    assert_eq!(sent, 1);
    let messages = channel.sent.lock().await;
    assert!(messages[0].1.starts_with("Reminder: Standup"));
}
