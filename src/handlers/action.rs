/// Closed set of button actions carried in Discord component custom ids.
/// Anything that does not decode is ignored by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Snooze { notification_id: i64, minutes: i64 },
    Acknowledge { notification_id: i64 },
    ConfirmMeeting { token: String },
    EditMeeting { token: String },
    CancelMeeting { token: String },
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Snooze {
                notification_id,
                minutes,
            } => format!("snooze:{}:{}", notification_id, minutes),
            CallbackAction::Acknowledge { notification_id } => {
                format!("ack:{}", notification_id)
            }
            CallbackAction::ConfirmMeeting { token } => format!("meet_confirm:{}", token),
            CallbackAction::EditMeeting { token } => format!("meet_edit:{}", token),
            CallbackAction::CancelMeeting { token } => format!("meet_cancel:{}", token),
        }
    }

    pub fn decode(raw: &str) -> Option<CallbackAction> {
        let mut parts = raw.splitn(3, ':');
        let kind = parts.next()?;
        match kind {
            "snooze" => {
                let notification_id = parts.next()?.parse().ok()?;
                let minutes = parts.next()?.parse().ok()?;
                Some(CallbackAction::Snooze {
                    notification_id,
                    minutes,
                })
            }
            "ack" => {
                let notification_id = parts.next()?.parse().ok()?;
                Some(CallbackAction::Acknowledge { notification_id })
            }
            "meet_confirm" => Some(CallbackAction::ConfirmMeeting {
                token: parts.next()?.to_string(),
            }),
            "meet_edit" => Some(CallbackAction::EditMeeting {
                token: parts.next()?.to_string(),
            }),
            "meet_cancel" => Some(CallbackAction::CancelMeeting {
                token: parts.next()?.to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snooze_round_trips() {
        let action = CallbackAction::Snooze {
            notification_id: 17,
            minutes: 15,
        };
        assert_eq!(action.encode(), "snooze:17:15");
        assert_eq!(CallbackAction::decode("snooze:17:15"), Some(action));
    }

    #[test]
    fn ack_round_trips() {
        let action = CallbackAction::Acknowledge { notification_id: 3 };
        assert_eq!(action.encode(), "ack:3");
        assert_eq!(CallbackAction::decode("ack:3"), Some(action));
    }

    #[test]
    fn draft_tokens_round_trip() {
        for raw in ["meet_confirm:abc-123", "meet_edit:abc-123", "meet_cancel:abc-123"] {
            let decoded = CallbackAction::decode(raw).unwrap();
            assert_eq!(decoded.encode(), raw);
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(CallbackAction::decode("snooze:abc:15"), None);
        assert_eq!(CallbackAction::decode("snooze:5"), None);
        assert_eq!(CallbackAction::decode("launch:5"), None);
        assert_eq!(CallbackAction::decode(""), None);
    }
}
