use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serenity::async_trait;
use tracing::warn;

use crate::error::ProviderError;
use crate::models::account::LinkedAccount;

use super::{CalendarEvent, CalendarProvider};

const EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

/// Google Calendar v3 over plain REST. The access token comes from the
/// linked account row; acquiring and refreshing it is the OAuth flow's job,
/// a 401/403 here just means the link went stale.
pub struct GoogleProvider {
    client: reqwest::Client,
}

impl GoogleProvider {
    pub fn new() -> Self {
        // Bounds a stuck provider call so one account cannot hold its sync
        // slot indefinitely.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for GoogleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<GoogleEvent>,
}

#[derive(Debug, Deserialize)]
struct GoogleEvent {
    #[serde(default)]
    id: String,
    summary: Option<String>,
    location: Option<String>,
    description: Option<String>,
    start: Option<GoogleTime>,
    end: Option<GoogleTime>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GoogleTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    date: Option<String>,
}

#[derive(Debug, Serialize)]
struct InsertEventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: GoogleTime,
    end: GoogleTime,
}

#[derive(Debug, Deserialize)]
struct InsertedEvent {
    #[serde(default)]
    id: String,
}

/// Timed events carry an RFC 3339 `dateTime`; all-day events carry a bare
/// `date`, normalized here to UTC midnight.
fn parse_google_time(value: &GoogleTime) -> Result<DateTime<Utc>, ProviderError> {
    if let Some(raw) = &value.date_time {
        return DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| ProviderError::Malformed(format!("bad dateTime {raw:?}: {err}")));
    }
    if let Some(raw) = &value.date {
        let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|err| ProviderError::Malformed(format!("bad date {raw:?}: {err}")))?;
        let midnight = day
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ProviderError::Malformed(format!("bad date {raw:?}")))?;
        return Ok(midnight.and_utc());
    }
    Err(ProviderError::Malformed("event time missing".to_string()))
}

fn status_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthExpired,
        429 => ProviderError::RateLimited,
        _ => ProviderError::Network(format!("status {status}: {body}")),
    }
}

#[async_trait]
impl CalendarProvider for GoogleProvider {
    async fn get_events(
        &self,
        account: &LinkedAccount,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<CalendarEvent>, ProviderError> {
        let response = self
            .client
            .get(EVENTS_URL)
            .bearer_auth(&account.access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
                ("maxResults", "250".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let list: EventList = serde_json::from_str(&body)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        let mut events = Vec::with_capacity(list.items.len());
        for item in list.items {
            let Some(start) = &item.start else {
                warn!(event_id = %item.id, "skipping event without start time");
                continue;
            };
            let start_at = match parse_google_time(start) {
                Ok(dt) => dt,
                Err(err) => {
                    warn!(event_id = %item.id, error = %err, "skipping event with bad start time");
                    continue;
                }
            };
            // Tolerate a missing or unparseable end; the meeting row keeps a
            // null end in that case.
            let end_at = item.end.as_ref().and_then(|t| parse_google_time(t).ok());
            events.push(CalendarEvent {
                external_id: item.id,
                title: item.summary,
                start_at,
                end_at,
                location: item.location,
                description: item.description,
            });
        }
        Ok(events)
    }

    async fn create_event(
        &self,
        account: &LinkedAccount,
        title: &str,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Result<String, ProviderError> {
        let body = InsertEventBody {
            summary: title,
            description: "Created from a voice note",
            start: GoogleTime {
                date_time: Some(start_at.to_rfc3339()),
                date: None,
            },
            end: GoogleTime {
                date_time: Some(end_at.to_rfc3339()),
                date: None,
            },
        };

        let response = self
            .client
            .post(EVENTS_URL)
            .bearer_auth(&account.access_token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(status_error(status, &text));
        }

        let inserted: InsertedEvent = serde_json::from_str(&text)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        if inserted.id.is_empty() {
            return Err(ProviderError::Malformed("created event has no id".to_string()));
        }
        Ok(inserted.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timed_event() {
        let time = GoogleTime {
            date_time: Some("2025-09-01T10:00:00+03:00".to_string()),
            date: None,
        };
        let parsed = parse_google_time(&time).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-09-01T07:00:00+00:00");
    }

    #[test]
    fn parses_all_day_event_as_utc_midnight() {
        let time = GoogleTime {
            date_time: None,
            date: Some("2025-09-01".to_string()),
        };
        let parsed = parse_google_time(&time).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-09-01T00:00:00+00:00");
    }

    #[test]
    fn rejects_empty_time() {
        let time = GoogleTime {
            date_time: None,
            date: None,
        };
        assert!(parse_google_time(&time).is_err());
    }
}
