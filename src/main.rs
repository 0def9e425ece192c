#![allow(non_snake_case)]

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use meetBot::cli;
use meetBot::config::{AppConfig, Settings};
use meetBot::runtime;
use meetBot::store;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::load(&config);

    let db = store::open(&settings.db_path).expect("Unable to open database.");
    let shared_db = Arc::new(tokio::sync::Mutex::new(db));

    match settings.run_mode.as_str() {
        "api" => runtime::run_api(shared_db, settings).await,
        "cli" => cli::cli(shared_db, &settings).await,
        other => println!("Invalid run mode {}", other),
    }
}
