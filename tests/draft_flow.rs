mod support;

use chrono::Utc;
use serenity::async_trait;

use meetBot::service::extractor_service::{MeetingExtractor, SuggestedMeeting};
use meetBot::service::meeting_service::{ConfirmError, confirm_meeting, create_meeting_drafts};
use meetBot::service::draft_store::{MeetingDraft, draft_expiry};
use meetBot::service::sync_service::sync_all_accounts;
use meetBot::store;

use support::{ScriptedProvider, event, seed_linked_account, utc};

struct FakeExtractor {
    suggestions: Vec<SuggestedMeeting>,
}

#[async_trait]
impl MeetingExtractor for FakeExtractor {
    async fn suggest_meetings(
        &self,
        _transcript: &str,
    ) -> Result<Vec<SuggestedMeeting>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.suggestions.clone())
    }

    async fn summarize(
        &self,
        _transcript: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Ok("summary".to_string())
    }
}

fn suggestion(title: &str, start_local: &str, timezone: &str, duration_min: i64) -> SuggestedMeeting {
    SuggestedMeeting {
        title: title.to_string(),
        start_local: start_local.to_string(),
        timezone: timezone.to_string(),
        duration_min,
    }
}

fn draft_for(discord_user_id: &str) -> MeetingDraft {
    let now = Utc::now();
    MeetingDraft {
        discord_user_id: discord_user_id.to_string(),
        channel_id: "123".to_string(),
        title: "Sprint planning".to_string(),
        start_at: utc(2025, 9, 1, 10, 0),
        duration_min: 30,
        timezone: "UTC".to_string(),
        source_transcript: "plan the sprint".to_string(),
        message_id: None,
        expires_at: draft_expiry(now),
    }
}

#[tokio::test]
async fn invalid_suggestions_are_dropped_not_fatal() {
    let extractor = FakeExtractor {
        suggestions: vec![
            suggestion("Standup", "2025-09-01 10:00", "UTC", 15),
            suggestion("", "2025-09-01 10:00", "UTC", 15),
            suggestion("Review", "next tuesday", "UTC", 30),
            suggestion("Retro", "2025-09-02 16:00", "Mars/Olympus", 30),
            suggestion("Too long", "2025-09-03 10:00", "UTC", 9999),
        ],
    };
    let drafts = create_meeting_drafts(&extractor, "plan things", "42", "123", Utc::now())
        .await
        .unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].title, "Standup");
    assert_eq!(drafts[0].start_at, utc(2025, 9, 1, 10, 0));
}

#[tokio::test]
async fn confirm_requires_a_linked_calendar() {
    let mut conn = store::open_in_memory().unwrap();
    // Account exists but never linked a calendar.
    store::accounts::create(&conn, Some("42"), None).unwrap();
    let provider = ScriptedProvider::new();

    let result = confirm_meeting(&mut conn, &provider, &draft_for("42"), Utc::now()).await;
    assert!(matches!(result, Err(ConfirmError::NotLinked)));
    assert_eq!(store::meetings::count(&conn).unwrap(), 0);
}

#[tokio::test]
async fn confirmed_meeting_gets_reminders_immediately() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);
    let provider = ScriptedProvider::new();

    let external_id = confirm_meeting(&mut conn, &provider, &draft_for("42"), now)
        .await
        .unwrap();
    assert_eq!(external_id, "scripted-created-1");

    let meetings = store::meetings::upcoming(&conn, account_id, now, 14).unwrap();
    assert_eq!(meetings.len(), 1);
    let reminders = store::notifications::for_meeting(&conn, meetings[0].id).unwrap();
    assert_eq!(reminders.len(), 2);
}

#[tokio::test]
async fn next_sync_matches_the_confirmed_meeting_instead_of_duplicating() {
    let mut conn = store::open_in_memory().unwrap();
    let account_id = seed_linked_account(&conn, Some("42"));
    let now = utc(2025, 8, 30, 10, 0);

    let provider = ScriptedProvider::new();
    let external_id = confirm_meeting(&mut conn, &provider, &draft_for("42"), now)
        .await
        .unwrap();

    // The provider now reports the event we just created.
    let provider = ScriptedProvider::new().with_events(
        account_id,
        vec![event(&external_id, "Sprint planning", utc(2025, 9, 1, 10, 0))],
    );
    sync_all_accounts(&mut conn, &provider, now, 14).await.unwrap();

    assert_eq!(store::meetings::count(&conn).unwrap(), 1);
    assert_eq!(store::notifications::count(&conn).unwrap(), 2);
}
