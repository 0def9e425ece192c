use thiserror::Error;

/// External calendar fetch failed. Retried on the next scheduled sync pass,
/// never within the same run.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("calendar credentials expired or revoked")]
    AuthExpired,
    #[error("calendar provider rate limited")]
    RateLimited,
    #[error("calendar request failed: {0}")]
    Network(String),
    #[error("unexpected calendar payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.to_string())
    }
}

/// Persistence failed. Aborts the current account's or item's unit of work only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Delivery failed. The item stays pending and is retried on the next
/// dispatch poll.
#[derive(Debug, Error)]
#[error("channel send failed: {0}")]
pub struct ChannelError(pub String);

/// Malformed draft data from the conversational layer. Rejected at the
/// boundary, never reaches the store.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unparseable date/time: {0}")]
    BadDateTime(String),
    #[error("unknown timezone: {0}")]
    BadTimezone(String),
    #[error("duration out of range: {0} minutes")]
    BadDuration(i64),
    #[error("meeting title is empty")]
    EmptyTitle,
}

/// Per-account sync failure. Caught by the all-accounts pass so one account
/// never aborts the others.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
