use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use inquire::Text;
use rusqlite::Connection;
use tokio::sync::Mutex;

use crate::config::Settings;
use crate::runtime;
use crate::service::extractor_service::MistralService;
use crate::service::meeting_service::create_meeting_drafts;
use crate::tasks::notification_loop::{self, DiscordChannel};

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one calendar sync pass over all linked accounts
    Sync,
    /// Run one reminder dispatch pass
    Dispatch,
    /// Extract meeting proposals from a transcript
    Plan { transcript: String },
    /// Extract meeting proposals from an interactive prompt
    PlanPrompt {},
}

pub async fn cli(shared_db: Arc<Mutex<Connection>>, settings: &Settings) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Sync => {
            let provider = runtime::build_provider(settings);
            let mut conn = shared_db.lock().await;
            match crate::service::sync_service::sync_all_accounts(
                &mut conn,
                provider.as_ref(),
                Utc::now(),
                settings.sync_window_days,
            )
            .await
            {
                Ok(outcome) => println!(
                    "Synced {} account(s), {} failed, {} event(s) seen",
                    outcome.accounts_synced, outcome.accounts_failed, outcome.events_seen
                ),
                Err(e) => println!("Sync failed: {}", e),
            }
        }
        Commands::Dispatch => {
            let token = settings
                .discord_token
                .clone()
                .expect("DISCORD_CLIENT_SECRET must be set for dispatch");
            let channel = DiscordChannel::new(&token);
            let mut conn = shared_db.lock().await;
            match notification_loop::dispatch_tick(
                &mut conn,
                &channel,
                Utc::now(),
                settings.dispatch_batch_limit,
            )
            .await
            {
                Ok(sent) => println!("Dispatched {} reminder(s)", sent),
                Err(e) => println!("Dispatch failed: {}", e),
            }
        }
        Commands::Plan { transcript } => {
            plan(transcript, settings).await;
        }
        Commands::PlanPrompt {} => {
            let transcript = match specify_prompt() {
                Ok(text) => text,
                Err(_) => {
                    println!("No transcript supplied");
                    return;
                }
            };
            plan(&transcript, settings).await;
        }
    }
}

async fn plan(transcript: &str, settings: &Settings) {
    let api_key = settings
        .mistral_api_key
        .clone()
        .expect("MISTRAL_API_KEY must be set for plan");
    let extractor = MistralService::new(api_key);
    match create_meeting_drafts(&extractor, transcript, "cli", "cli", Utc::now()).await {
        Ok(drafts) if drafts.is_empty() => println!("No meetings found."),
        Ok(drafts) => {
            for draft in drafts {
                println!(
                    "{} | {} | {} min ({})",
                    draft.title,
                    draft.start_at.format("%Y-%m-%d %H:%M UTC"),
                    draft.duration_min,
                    draft.timezone
                );
            }
        }
        Err(e) => println!("Failed to extract meetings: {}", e),
    }
}

fn specify_prompt() -> Result<String, Box<dyn std::error::Error>> {
    Ok(Text::new("Describe the meetings to plan.").prompt()?)
}
