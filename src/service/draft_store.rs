use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// How long an unconfirmed draft stays alive.
pub const DRAFT_TTL_MINUTES: i64 = 15;

/// A meeting proposal awaiting user confirmation. Lives only until
/// confirmed, canceled, or expired; loss on process restart is accepted.
#[derive(Debug, Clone)]
pub struct MeetingDraft {
    pub discord_user_id: String,
    pub channel_id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub duration_min: i64,
    pub timezone: String,
    pub source_transcript: String,
    pub message_id: Option<u64>,
    pub expires_at: DateTime<Utc>,
}

/// In-process draft table keyed by opaque token, with explicit TTL and
/// eviction on every access.
#[derive(Debug, Default)]
pub struct DraftStore {
    drafts: HashMap<String, MeetingDraft>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, draft: MeetingDraft, now: DateTime<Utc>) -> String {
        self.evict_expired(now);
        let token = Uuid::new_v4().to_string();
        self.drafts.insert(token.clone(), draft);
        token
    }

    pub fn get(&mut self, token: &str, now: DateTime<Utc>) -> Option<MeetingDraft> {
        self.evict_expired(now);
        self.drafts.get(token).cloned()
    }

    pub fn take(&mut self, token: &str, now: DateTime<Utc>) -> Option<MeetingDraft> {
        self.evict_expired(now);
        self.drafts.remove(token)
    }

    /// Replaces the draft under an existing token, e.g. after an edit.
    pub fn put(&mut self, token: &str, draft: MeetingDraft) {
        self.drafts.insert(token.to_string(), draft);
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }

    fn evict_expired(&mut self, now: DateTime<Utc>) {
        self.drafts.retain(|_, draft| draft.expires_at > now);
    }
}

pub fn draft_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::minutes(DRAFT_TTL_MINUTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn draft(expires_at: DateTime<Utc>) -> MeetingDraft {
        MeetingDraft {
            discord_user_id: "42".to_string(),
            channel_id: "123".to_string(),
            title: "Planning".to_string(),
            start_at: expires_at + Duration::hours(1),
            duration_min: 30,
            timezone: "UTC".to_string(),
            source_transcript: "plan tomorrow".to_string(),
            message_id: None,
            expires_at,
        }
    }

    #[test]
    fn expired_drafts_are_evicted_on_access() {
        let now = Utc.with_ymd_and_hms(2025, 8, 30, 10, 0, 0).unwrap();
        let mut store = DraftStore::new();
        let token = store.insert(draft(now + Duration::minutes(5)), now);

        assert!(store.get(&token, now + Duration::minutes(4)).is_some());
        assert!(store.get(&token, now + Duration::minutes(5)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn take_removes_the_draft() {
        let now = Utc.with_ymd_and_hms(2025, 8, 30, 10, 0, 0).unwrap();
        let mut store = DraftStore::new();
        let token = store.insert(draft(draft_expiry(now)), now);

        assert!(store.take(&token, now).is_some());
        assert!(store.take(&token, now).is_none());
    }
}
