use chrono::{DateTime, Utc};
use serenity::async_trait;

use crate::error::ProviderError;
use crate::models::account::LinkedAccount;

pub mod fake;
pub mod google;

/// One event in provider-neutral shape. All-day events arrive already
/// normalized to UTC-midnight instants by the provider implementation.
#[derive(Debug, Clone)]
pub struct CalendarEvent {
    pub external_id: String,
    pub title: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Events for the account within `[time_min, time_max]`.
    async fn get_events(
        &self,
        account: &LinkedAccount,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, ProviderError>;

    /// Creates an event in the account's calendar and returns the provider's
    /// event id, which becomes the meeting's external_id locally.
    async fn create_event(
        &self,
        account: &LinkedAccount,
        title: &str,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<String, ProviderError>;
}
