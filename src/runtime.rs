use std::sync::Arc;

use chrono::Utc;
use rusqlite::Connection;
use serde_json::json;
use serenity::model::gateway::GatewayIntents;
use tokio::sync::Mutex;
use tracing::{error, info};
use warp::Filter;

use crate::calendar::CalendarProvider;
use crate::calendar::fake::FakeProvider;
use crate::calendar::google::GoogleProvider;
use crate::clients::stt_client::HttpSttClient;
use crate::config::Settings;
use crate::handlers::discord::BotHandler;
use crate::service::draft_store::DraftStore;
use crate::service::extractor_service::MistralService;
use crate::service::sync_service;
use crate::tasks::notification_loop::{self, DiscordChannel};
use crate::tasks::sync_loop;
use crate::tasks::task_runner::TaskRunner;

pub fn build_provider(settings: &Settings) -> Arc<dyn CalendarProvider> {
    if settings.calendar_provider == "fake" {
        info!("using fake calendar provider");
        Arc::new(FakeProvider)
    } else {
        Arc::new(GoogleProvider::new())
    }
}

pub async fn run_api(shared_db: Arc<Mutex<Connection>>, settings: Settings) {
    let token = settings
        .discord_token
        .clone()
        .expect("DISCORD_CLIENT_SECRET must be set for bot mode");
    let mistral_api_key = settings
        .mistral_api_key
        .clone()
        .expect("MISTRAL_API_KEY must be set for bot mode");
    let token_arc = Arc::new(token.clone());

    let provider = build_provider(&settings);
    let extractor = Arc::new(MistralService::new(mistral_api_key));
    let stt = Arc::new(HttpSttClient::new(settings.stt_url.clone()));
    let drafts = Arc::new(Mutex::new(DraftStore::new()));

    let mut task_runner = TaskRunner::new();
    task_runner.add_task({
        let db = shared_db.clone();
        let provider = provider.clone();
        let interval = settings.sync_interval_secs;
        let window_days = settings.sync_window_days;
        move || {
            tokio::spawn(async move {
                sync_loop::run_sync_loop(db, provider, interval, window_days).await;
            });
        }
    });
    task_runner.add_task({
        let db = shared_db.clone();
        let token = token_arc.clone();
        let interval = settings.dispatch_interval_secs;
        let batch_limit = settings.dispatch_batch_limit;
        move || {
            tokio::spawn(async move {
                notification_loop::run_notification_loop(db, token, interval, batch_limit).await;
            });
        }
    });
    task_runner.add_task({
        let db = shared_db.clone();
        let provider = provider.clone();
        let token = token_arc.clone();
        let settings = settings.clone();
        move || {
            tokio::spawn(async move {
                run_debug_server(db, provider, token, settings).await;
            });
        }
    });
    task_runner.start_all();

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;
    let mut client = serenity::Client::builder(token, intents)
        .event_handler(BotHandler::new(
            shared_db,
            drafts,
            extractor,
            stt,
            provider,
            settings.public_url.clone(),
        ))
        .await
        .expect("Error creating Serenity client");

    if let Err(why) = client.start().await {
        error!(error = ?why, "Discord client stopped");
    }
}

/// Operator endpoints: a liveness probe plus debug triggers that run one
/// sync or dispatch pass outside the timers.
pub async fn run_debug_server(
    shared_db: Arc<Mutex<Connection>>,
    provider: Arc<dyn CalendarProvider>,
    token: Arc<String>,
    settings: Settings,
) {
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let sync_db = shared_db.clone();
    let sync_provider = provider.clone();
    let window_days = settings.sync_window_days;
    let sync_route = warp::path!("debug" / "sync").and(warp::post()).then(move || {
        let db = sync_db.clone();
        let provider = sync_provider.clone();
        let fut: std::pin::Pin<Box<dyn Future<Output = warp::reply::Json> + Send>> = Box::pin(async move {
            let mut conn = db.lock().await;
            match sync_service::sync_all_accounts(&mut conn, provider.as_ref(), Utc::now(), window_days)
                .await
            {
                Ok(outcome) => warp::reply::json(&json!({
                    "status": "ok",
                    "accounts_synced": outcome.accounts_synced,
                    "accounts_failed": outcome.accounts_failed,
                    "events_seen": outcome.events_seen,
                })),
                Err(err) => warp::reply::json(&json!({
                    "status": "error",
                    "error": err.to_string(),
                })),
            }
        });
        fut
    });

    let dispatch_db = shared_db.clone();
    let dispatch_token = token.clone();
    let batch_limit = settings.dispatch_batch_limit;
    let dispatch_route = warp::path!("debug" / "dispatch")
        .and(warp::post())
        .then(move || {
            let db = dispatch_db.clone();
            let token = dispatch_token.clone();
            let fut: std::pin::Pin<Box<dyn Future<Output = warp::reply::Json> + Send>> = Box::pin(async move {
                let channel = DiscordChannel::new(&token);
                let mut conn = db.lock().await;
                match notification_loop::dispatch_tick(&mut conn, &channel, Utc::now(), batch_limit)
                    .await
                {
                    Ok(sent) => warp::reply::json(&json!({ "status": "ok", "sent": sent })),
                    Err(err) => warp::reply::json(&json!({
                        "status": "error",
                        "error": err.to_string(),
                    })),
                }
            });
            fut
        });

    let routes = health.or(sync_route).or(dispatch_route);
    info!(port = settings.http_port, "debug server listening");
    let server: std::pin::Pin<Box<dyn Future<Output = ()> + Send>> =
        Box::pin(warp::serve(routes).run(([0, 0, 0, 0], settings.http_port)));
    server.await;
}
