use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rusqlite::Connection;
use thiserror::Error;
use tracing::warn;

use crate::calendar::CalendarProvider;
use crate::error::{ProviderError, StoreError, ValidationError};
use crate::models::notification::{DELIVERY_CHANNEL, Notification};
use crate::service::draft_store::{MeetingDraft, draft_expiry};
use crate::service::extractor_service::MeetingExtractor;
use crate::service::sync_service::reminder_offsets;
use crate::store;
use crate::store::meetings::MeetingUpsert;

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("calendar is not linked for this account")]
    NotLinked,
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

const MIN_DURATION_MIN: i64 = 5;
const MAX_DURATION_MIN: i64 = 480;

/// Boundary validation for draft fields coming from the conversational
/// layer or the extractor. Returns the resolved UTC start/end pair.
pub fn validate_draft(
    title: &str,
    start_local: &str,
    timezone: &str,
    duration_min: i64,
) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if !(MIN_DURATION_MIN..=MAX_DURATION_MIN).contains(&duration_min) {
        return Err(ValidationError::BadDuration(duration_min));
    }
    let tz = Tz::from_str(timezone)
        .map_err(|_| ValidationError::BadTimezone(timezone.to_string()))?;
    let naive = NaiveDateTime::parse_from_str(start_local.trim(), "%Y-%m-%d %H:%M")
        .map_err(|_| ValidationError::BadDateTime(start_local.to_string()))?;
    let local = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ValidationError::BadDateTime(start_local.to_string()))?;
    let start = local.with_timezone(&Utc);
    let end = start + Duration::minutes(duration_min);
    Ok((start, end))
}

/// Runs the extractor over a transcript and turns every suggestion that
/// survives validation into a draft. Invalid suggestions are dropped with a
/// log line rather than failing the batch.
pub async fn create_meeting_drafts(
    extractor: &dyn MeetingExtractor,
    transcript: &str,
    discord_user_id: &str,
    channel_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<MeetingDraft>, Box<dyn std::error::Error + Send + Sync>> {
    let suggestions = extractor.suggest_meetings(transcript).await?;
    let mut drafts = Vec::new();
    for suggestion in suggestions {
        match validate_draft(
            &suggestion.title,
            &suggestion.start_local,
            &suggestion.timezone,
            suggestion.duration_min,
        ) {
            Ok((start_at, _end)) => drafts.push(MeetingDraft {
                discord_user_id: discord_user_id.to_string(),
                channel_id: channel_id.to_string(),
                title: suggestion.title,
                start_at,
                duration_min: suggestion.duration_min,
                timezone: suggestion.timezone,
                source_transcript: transcript.to_string(),
                message_id: None,
                expires_at: draft_expiry(now),
            }),
            Err(err) => {
                warn!(title = %suggestion.title, error = %err, "dropping invalid meeting suggestion");
            }
        }
    }
    Ok(drafts)
}

/// Confirms a draft: creates the event at the provider, then writes the
/// local meeting through the same upsert key space the sync pass uses, so
/// the next reconciliation matches the row instead of duplicating it.
/// Returns the provider's event id.
pub async fn confirm_meeting(
    conn: &mut Connection,
    provider: &dyn CalendarProvider,
    draft: &MeetingDraft,
    now: DateTime<Utc>,
) -> Result<String, ConfirmError> {
    let account = store::accounts::get_by_discord_id(conn, &draft.discord_user_id)?
        .ok_or(ConfirmError::NotLinked)?;
    let linked = store::accounts::linked_account(conn, account.id)?
        .ok_or(ConfirmError::NotLinked)?;

    let end_at = draft.start_at + Duration::minutes(draft.duration_min);
    let external_id = provider
        .create_event(&linked, &draft.title, draft.start_at, end_at)
        .await?;

    let tx = conn.transaction().map_err(StoreError::from)?;
    let meeting_id = store::meetings::upsert(
        &tx,
        account.id,
        &external_id,
        &MeetingUpsert {
            title: Some(&draft.title),
            start_at: Some(draft.start_at),
            end_at: Some(end_at),
            location: None,
            description: Some("Created from a voice note"),
        },
        now,
    )?;
    for offset in reminder_offsets() {
        let fire_at = draft.start_at - offset;
        if fire_at <= now {
            continue;
        }
        store::notifications::ensure_scheduled(
            &tx,
            account.id,
            meeting_id,
            fire_at,
            DELIVERY_CHANNEL,
        )?;
    }
    tx.commit().map_err(StoreError::from)?;
    Ok(external_id)
}

/// Pushes a reminder's fire time forward and re-arms it as pending.
pub fn snooze_notification(
    conn: &mut Connection,
    id: i64,
    minutes: i64,
) -> Result<Notification, StoreError> {
    store::notifications::snooze(conn, id, minutes)
}

/// Closes a reminder without delivery.
pub fn acknowledge_notification(
    conn: &Connection,
    id: i64,
    now: DateTime<Utc>,
) -> Result<Notification, StoreError> {
    store::notifications::acknowledge(conn, id, now)
}
