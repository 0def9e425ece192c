use chrono::{DateTime, Duration, Utc};
use serenity::async_trait;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::models::account::LinkedAccount;

use super::{CalendarEvent, CalendarProvider};

/// In-process provider for local runs and the debug surface. Serves two
/// fixed events anchored to the current time, filtered by window overlap.
pub struct FakeProvider;

impl FakeProvider {
    fn sample_events(account: &LinkedAccount, base: DateTime<Utc>) -> Vec<CalendarEvent> {
        vec![
            CalendarEvent {
                external_id: "evt-1".to_string(),
                title: Some("Standup Meeting".to_string()),
                start_at: base + Duration::minutes(5),
                end_at: Some(base + Duration::minutes(20)),
                location: Some("Online".to_string()),
                description: Some(format!("Account={}", account.account.id)),
            },
            CalendarEvent {
                external_id: "evt-2".to_string(),
                title: Some("Planning".to_string()),
                start_at: base + Duration::hours(1),
                end_at: Some(base + Duration::hours(2)),
                location: Some("Room 101".to_string()),
                description: Some("Quarter planning".to_string()),
            },
        ]
    }
}

#[async_trait]
impl CalendarProvider for FakeProvider {
    async fn get_events(
        &self,
        account: &LinkedAccount,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, ProviderError> {
        let base = Utc::now();
        let events = Self::sample_events(account, base)
            .into_iter()
            .filter(|e| {
                let end = e.end_at.unwrap_or(e.start_at);
                !(end <= time_min || e.start_at >= time_max)
            })
            .collect();
        Ok(events)
    }

    async fn create_event(
        &self,
        _account: &LinkedAccount,
        _title: &str,
        _start_at: DateTime<Utc>,
        _end_at: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        Ok(format!("fake-{}", Uuid::new_v4()))
    }
}
