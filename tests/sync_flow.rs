mod support;

use chrono::Duration;

use meetBot::service::sync_service::{sync_account, sync_all_accounts};
use meetBot::store;

use support::{ScriptedProvider, event, seed_linked_account, utc};

#[tokio::test]
async fn repeated_sync_upserts_instead_of_duplicating() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);
    let provider = ScriptedProvider::new()
        .with_events(account_id, vec![event("evt-1", "Planning", now + Duration::days(2))]);

    for _ in 0..2 {
        let outcome = sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();
        assert_eq!(outcome.accounts_synced, 1);
        assert_eq!(outcome.events_seen, 1);
    }

    assert_eq!(store::meetings::count(&conn).unwrap(), 1);
    // One reminder a day before plus one an hour before, created once.
    assert_eq!(store::notifications::count(&conn).unwrap(), 2);
}

#[tokio::test]
async fn near_past_meeting_only_gets_future_reminders() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);
    // Starts in two hours: the day-before reminder moment is already gone.
    let provider = ScriptedProvider::new()
        .with_events(account_id, vec![event("evt-1", "Soon", now + Duration::hours(2))]);

    sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();

    assert_eq!(store::notifications::count(&conn).unwrap(), 1);
    let due = store::notifications::due_batch(&conn, now + Duration::hours(1), 20).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].scheduled_at, now + Duration::hours(1));
}

#[tokio::test]
async fn one_failing_account_does_not_abort_the_pass() {
    let mut conn = store::open_in_memory().unwrap();
    let failing = seed_linked_account(&conn, Some("1"));
    let healthy_b = seed_linked_account(&conn, Some("2"));
    let healthy_c = seed_linked_account(&conn, Some("3"));
    let now = utc(2025, 8, 30, 10, 0);
    let provider = ScriptedProvider::new()
        .failing_for(failing)
        .with_events(healthy_b, vec![event("evt-b", "B", now + Duration::days(3))])
        .with_events(healthy_c, vec![event("evt-c", "C", now + Duration::days(4))]);

    let outcome = sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();

    assert_eq!(outcome.accounts_synced, 2);
    assert_eq!(outcome.accounts_failed, 1);
    assert_eq!(store::meetings::count(&conn).unwrap(), 2);
}

#[tokio::test]
async fn resync_overwrites_changed_fields() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);
    let start = now + Duration::days(2);

    let provider = ScriptedProvider::new()
        .with_events(account_id, vec![event("evt-1", "Planning", start)]);
    sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();

    let mut moved = event("evt-1", "Planning (moved)", start + Duration::hours(1));
    moved.location = Some("Room 12".to_string());
    let provider = ScriptedProvider::new().with_events(account_id, vec![moved]);
    sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();

    assert_eq!(store::meetings::count(&conn).unwrap(), 1);
    let linked = store::accounts::linked_account(&conn, account_id).unwrap().unwrap();
    assert_eq!(linked.account.id, account_id);
    let meetings = store::meetings::upcoming(&conn, account_id, now, 14).unwrap();
    assert_eq!(meetings[0].title.as_deref(), Some("Planning (moved)"));
    assert_eq!(meetings[0].location.as_deref(), Some("Room 12"));
    assert_eq!(meetings[0].start_at, Some(start + Duration::hours(1)));
}

#[tokio::test]
async fn reminders_land_a_day_and_an_hour_before_the_meeting() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);
    let start = utc(2025, 9, 1, 10, 0);
    let provider = ScriptedProvider::new()
        .with_events(account_id, vec![event("evt-1", "Kickoff", start)]);

    let linked = store::accounts::linked_account(&conn, account_id).unwrap().unwrap();
    let seen = sync_account(&mut conn, &provider, &linked, now, 14).await.unwrap();
    assert_eq!(seen, 1);

    let meetings = store::meetings::upcoming(&conn, account_id, now, 14).unwrap();
    let reminders = store::notifications::for_meeting(&conn, meetings[0].id).unwrap();
    let times: Vec<_> = reminders.iter().map(|n| n.scheduled_at).collect();
    assert_eq!(times, vec![utc(2025, 8, 31, 10, 0), utc(2025, 9, 1, 9, 0)]);
}
