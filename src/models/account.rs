/// One end user. Created on first interaction with the bot or the
/// calendar-link flow.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    /// Discord user id, as a string snowflake. None means the account has no
    /// reachable messaging channel.
    pub discord_user_id: Option<String>,
    pub timezone: Option<String>,
}

/// An account joined with its calendar credentials. Only accounts in this
/// shape are eligible for sync.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub account: Account,
    pub access_token: String,
}
