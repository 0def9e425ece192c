use chrono::{DateTime, Utc};

/// Delivery channel tag written on every reminder this bot schedules.
pub const DELIVERY_CHANNEL: &str = "discord";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    Pending,
    Acknowledged,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Acknowledged => "acknowledged",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(NotificationStatus::Pending),
            "acknowledged" => Some(NotificationStatus::Acknowledged),
            _ => None,
        }
    }
}

/// A scheduled reminder tied to one meeting and one fire time.
/// `sent_at == None` means pending; at most one row exists per
/// (meeting_id, scheduled_at) pair.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: i64,
    pub account_id: i64,
    pub meeting_id: Option<i64>,
    pub scheduled_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub status: NotificationStatus,
    pub channel: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for status in [NotificationStatus::Pending, NotificationStatus::Acknowledged] {
            assert_eq!(NotificationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(NotificationStatus::parse("snoozed"), None);
    }
}
