use std::collections::HashMap;
use std::env;
use std::fs;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(format!("Invalid config line {}: {}", idx + 1, line));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

const DEFAULT_RUN_MODE: &str = "cli";
const DEFAULT_DB_PATH: &str = "./data/meetbot.db";
const DEFAULT_STT_URL: &str = "http://localhost:2700";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8000";
const DEFAULT_HTTP_PORT: u16 = 8000;
const DEFAULT_CALENDAR_PROVIDER: &str = "google";
const DEFAULT_SYNC_WINDOW_DAYS: i64 = 14;
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 600;
const DEFAULT_DISPATCH_INTERVAL_SECS: u64 = 60;
const DEFAULT_DISPATCH_BATCH_LIMIT: i64 = 20;

/// Resolved runtime settings. Config file values win over environment
/// variables; anything unset falls back to a default.
#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: String,
    pub db_path: String,
    pub discord_token: Option<String>,
    pub mistral_api_key: Option<String>,
    pub stt_url: String,
    pub public_url: String,
    pub http_port: u16,
    pub calendar_provider: String,
    pub sync_window_days: i64,
    pub sync_interval_secs: u64,
    pub dispatch_interval_secs: u64,
    pub dispatch_batch_limit: i64,
}

impl Settings {
    pub fn load(config: &AppConfig) -> Self {
        let get_prop = |key: &str| -> Option<String> {
            config.get(key).or_else(|| env::var(key).ok())
        };
        Settings {
            run_mode: get_prop("RUN_MODE").unwrap_or_else(|| DEFAULT_RUN_MODE.to_string()),
            db_path: get_prop("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            discord_token: get_prop("DISCORD_CLIENT_SECRET"),
            mistral_api_key: get_prop("MISTRAL_API_KEY"),
            stt_url: get_prop("STT_URL").unwrap_or_else(|| DEFAULT_STT_URL.to_string()),
            public_url: get_prop("APP_PUBLIC_URL").unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string()),
            http_port: get_prop("HTTP_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
            calendar_provider: get_prop("CALENDAR_PROVIDER")
                .unwrap_or_else(|| DEFAULT_CALENDAR_PROVIDER.to_string()),
            sync_window_days: get_prop("SYNC_WINDOW_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SYNC_WINDOW_DAYS),
            sync_interval_secs: get_prop("SYNC_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
            dispatch_interval_secs: get_prop("DISPATCH_INTERVAL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DISPATCH_INTERVAL_SECS),
            dispatch_batch_limit: get_prop("DISPATCH_BATCH_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_DISPATCH_BATCH_LIMIT),
        }
    }
}
