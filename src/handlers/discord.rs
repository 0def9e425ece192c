use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use rusqlite::Connection;
use serenity::all::{
    ButtonStyle, Command, CommandOptionType, InputTextStyle, Interaction as DiscordInteraction,
};
use serenity::async_trait;
use serenity::builder::{
    CreateActionRow, CreateButton, CreateCommand, CreateCommandOption, CreateInputText,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, CreateModal,
};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::calendar::CalendarProvider;
use crate::clients::stt_client::SpeechToText;
use crate::handlers::action::CallbackAction;
use crate::service::draft_store::{DraftStore, MeetingDraft};
use crate::service::extractor_service::MeetingExtractor;
use crate::service::meeting_service::{
    self, ConfirmError, create_meeting_drafts, validate_draft,
};
use crate::store;

const UPCOMING_DAYS: i64 = 7;

pub struct BotHandler {
    db: Arc<Mutex<Connection>>,
    drafts: Arc<Mutex<DraftStore>>,
    extractor: Arc<dyn MeetingExtractor>,
    stt: Arc<dyn SpeechToText>,
    provider: Arc<dyn CalendarProvider>,
    public_url: String,
}

impl BotHandler {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        drafts: Arc<Mutex<DraftStore>>,
        extractor: Arc<dyn MeetingExtractor>,
        stt: Arc<dyn SpeechToText>,
        provider: Arc<dyn CalendarProvider>,
        public_url: String,
    ) -> Self {
        BotHandler {
            db,
            drafts,
            extractor,
            stt,
            provider,
            public_url,
        }
    }
}

/// Renders the confirmation card shown under a meeting draft.
pub fn render_draft_preview(draft: &MeetingDraft) -> String {
    let when = match Tz::from_str(&draft.timezone) {
        Ok(tz) => format!(
            "{} ({})",
            draft.start_at.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
            draft.timezone
        ),
        Err(_) => draft.start_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    };
    format!(
        "Meeting proposal: **{}**\nWhen: {}\nDuration: {} min\nConfirm to create it in your calendar.",
        draft.title, when, draft.duration_min
    )
}

pub fn draft_buttons(token: &str) -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(
            CallbackAction::ConfirmMeeting {
                token: token.to_string(),
            }
            .encode(),
        )
        .label("Confirm")
        .style(ButtonStyle::Success),
        CreateButton::new(
            CallbackAction::EditMeeting {
                token: token.to_string(),
            }
            .encode(),
        )
        .label("Edit")
        .style(ButtonStyle::Primary),
        CreateButton::new(
            CallbackAction::CancelMeeting {
                token: token.to_string(),
            }
            .encode(),
        )
        .label("Cancel")
        .style(ButtonStyle::Danger),
    ])
}

impl BotHandler {
    /// Posts one confirmation message per draft and records each in the
    /// draft store under a fresh token.
    async fn publish_drafts(
        &self,
        ctx: &Context,
        channel_id: serenity::model::id::ChannelId,
        drafts: Vec<MeetingDraft>,
    ) {
        let now = Utc::now();
        for mut draft in drafts {
            let preview = render_draft_preview(&draft);
            let token = {
                let mut store = self.drafts.lock().await;
                store.insert(draft.clone(), now)
            };
            match channel_id
                .send_message(
                    &ctx.http,
                    CreateMessage::new()
                        .content(preview)
                        .components(vec![draft_buttons(&token)]),
                )
                .await
            {
                Ok(message) => {
                    draft.message_id = Some(message.id.get());
                    let mut store = self.drafts.lock().await;
                    store.put(&token, draft);
                }
                Err(err) => {
                    error!(error = %err, "failed to post meeting draft");
                }
            }
        }
    }

    async fn handle_link(&self, ctx: &Context, command: serenity::all::CommandInteraction) {
        let discord_user_id = command.user.id.to_string();
        let account = {
            let conn = self.db.lock().await;
            store::accounts::ensure_account(&conn, &discord_user_id)
        };
        let content = match account {
            Ok(account) => format!(
                "Connect your Google Calendar here:\n{}/oauth/google/start?account={}",
                self.public_url, account.id
            ),
            Err(err) => {
                error!(error = %err, "failed to ensure account for /link");
                "Something went wrong, try again later.".to_string()
            }
        };
        let _ = command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .ephemeral(true),
                ),
            )
            .await;
    }

    async fn handle_meetings(&self, ctx: &Context, command: serenity::all::CommandInteraction) {
        let discord_user_id = command.user.id.to_string();
        let now = Utc::now();
        let listing = {
            let conn = self.db.lock().await;
            store::accounts::get_by_discord_id(&conn, &discord_user_id)
                .and_then(|account| match account {
                    Some(account) => {
                        store::meetings::upcoming(&conn, account.id, now, UPCOMING_DAYS)
                    }
                    None => Ok(Vec::new()),
                })
        };
        let content = match listing {
            Ok(meetings) if meetings.is_empty() => {
                "No meetings in the next 7 days. Use /link to connect your calendar.".to_string()
            }
            Ok(meetings) => {
                let mut lines = vec!["Upcoming meetings:".to_string()];
                for meeting in meetings {
                    let title = meeting.title.as_deref().unwrap_or("(untitled)");
                    let when = match meeting.start_at {
                        Some(start) => start.format("%Y-%m-%d %H:%M UTC").to_string(),
                        None => "?".to_string(),
                    };
                    lines.push(format!("- {}: {}", when, title));
                }
                lines.join("\n")
            }
            Err(err) => {
                error!(error = %err, "failed to list meetings");
                "Something went wrong, try again later.".to_string()
            }
        };
        let _ = command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(content)
                        .ephemeral(true),
                ),
            )
            .await;
    }

    async fn handle_plan(&self, ctx: &Context, command: serenity::all::CommandInteraction) {
        let text = command
            .data
            .options
            .iter()
            .find(|opt| opt.name == "text")
            .and_then(|opt| match &opt.value {
                serenity::all::CommandDataOptionValue::String(s) => Some(s.as_str()),
                _ => None,
            })
            .unwrap_or("")
            .to_string();

        if text.trim().is_empty() {
            let _ = command
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Missing `text` argument for /plan")
                            .ephemeral(true),
                    ),
                )
                .await;
            return;
        }

        let discord_user_id = command.user.id.to_string();
        let channel_id = command.channel_id;
        let drafts = create_meeting_drafts(
            self.extractor.as_ref(),
            &text,
            &discord_user_id,
            &channel_id.to_string(),
            Utc::now(),
        )
        .await;

        let (reply, drafts) = match drafts {
            Ok(drafts) if drafts.is_empty() => {
                ("I didn't find any meetings in that.".to_string(), Vec::new())
            }
            Ok(drafts) => (
                format!("Found {} meeting proposal(s), posting them below.", drafts.len()),
                drafts,
            ),
            Err(err) => {
                error!(error = %err, "meeting extraction failed");
                ("Failed to extract meetings, try again later.".to_string(), Vec::new())
            }
        };

        let _ = command
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(reply)
                        .ephemeral(true),
                ),
            )
            .await;

        if !drafts.is_empty() {
            self.publish_drafts(&ctx, channel_id, drafts).await;
        }
    }

    async fn handle_snooze(
        &self,
        ctx: &Context,
        interaction: serenity::all::ComponentInteraction,
        notification_id: i64,
        minutes: i64,
    ) {
        let result = {
            let mut conn = self.db.lock().await;
            meeting_service::snooze_notification(&mut conn, notification_id, minutes)
        };
        let response = match result {
            Ok(_) => CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content(format!("Snoozed for {} minutes.", minutes))
                    .components(vec![]),
            ),
            Err(err) => {
                warn!(notification_id, error = %err, "snooze failed");
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("This reminder is no longer available.")
                        .ephemeral(true),
                )
            }
        };
        let _ = interaction.create_response(&ctx.http, response).await;
    }

    async fn handle_acknowledge(
        &self,
        ctx: &Context,
        interaction: serenity::all::ComponentInteraction,
        notification_id: i64,
    ) {
        let result = {
            let conn = self.db.lock().await;
            meeting_service::acknowledge_notification(&conn, notification_id, Utc::now())
        };
        let response = match result {
            Ok(_) => CreateInteractionResponse::UpdateMessage(
                CreateInteractionResponseMessage::new()
                    .content("Done.")
                    .components(vec![]),
            ),
            Err(err) => {
                warn!(notification_id, error = %err, "acknowledge failed");
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("This reminder is no longer available.")
                        .ephemeral(true),
                )
            }
        };
        let _ = interaction.create_response(&ctx.http, response).await;
    }

    async fn handle_draft_confirm(
        &self,
        ctx: &Context,
        interaction: serenity::all::ComponentInteraction,
        token: &str,
    ) {
        let now = Utc::now();
        let maybe_draft = {
            let mut drafts = self.drafts.lock().await;
            drafts.take(token, now)
        };
        let Some(draft) = maybe_draft else {
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(
                        CreateInteractionResponseMessage::new()
                            .content("This proposal has expired.")
                            .components(vec![]),
                    ),
                )
                .await;
            return;
        };

        if draft.discord_user_id != interaction.user.id.to_string() {
            {
                let mut drafts = self.drafts.lock().await;
                drafts.put(token, draft);
            }
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Only the original requester can confirm this meeting.")
                            .ephemeral(true),
                    ),
                )
                .await;
            return;
        }

        let result = {
            let mut conn = self.db.lock().await;
            meeting_service::confirm_meeting(&mut conn, self.provider.as_ref(), &draft, now).await
        };
        let response = match result {
            Ok(_) => {
                info!(title = %draft.title, "meeting confirmed");
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content(format!(
                            "Created **{}** in your calendar. I'll remind you before it starts.",
                            draft.title
                        ))
                        .components(vec![]),
                )
            }
            Err(ConfirmError::NotLinked) => {
                let mut drafts = self.drafts.lock().await;
                drafts.put(token, draft);
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Connect your calendar first with /link.")
                        .ephemeral(true),
                )
            }
            Err(err) => {
                error!(error = %err, "meeting confirmation failed");
                let mut drafts = self.drafts.lock().await;
                drafts.put(token, draft);
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Failed to create the meeting, try again.")
                        .ephemeral(true),
                )
            }
        };
        let _ = interaction.create_response(&ctx.http, response).await;
    }

    async fn handle_draft_cancel(
        &self,
        ctx: &Context,
        interaction: serenity::all::ComponentInteraction,
        token: &str,
    ) {
        let now = Utc::now();
        let maybe_draft = {
            let mut drafts = self.drafts.lock().await;
            drafts.get(token, now)
        };
        let Some(draft) = maybe_draft else {
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(
                        CreateInteractionResponseMessage::new()
                            .content("This proposal has expired.")
                            .components(vec![]),
                    ),
                )
                .await;
            return;
        };

        if draft.discord_user_id != interaction.user.id.to_string() {
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Only the original requester can cancel this meeting.")
                            .ephemeral(true),
                    ),
                )
                .await;
            return;
        }

        {
            let mut drafts = self.drafts.lock().await;
            drafts.take(token, now);
        }
        let _ = interaction
            .create_response(
                &ctx.http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .content("Canceled.")
                        .components(vec![]),
                ),
            )
            .await;
    }

    async fn handle_draft_edit(
        &self,
        ctx: &Context,
        interaction: serenity::all::ComponentInteraction,
        token: &str,
    ) {
        let now = Utc::now();
        let maybe_draft = {
            let mut drafts = self.drafts.lock().await;
            drafts.get(token, now)
        };
        let Some(draft) = maybe_draft else {
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::UpdateMessage(
                        CreateInteractionResponseMessage::new()
                            .content("This proposal has expired.")
                            .components(vec![]),
                    ),
                )
                .await;
            return;
        };

        if draft.discord_user_id != interaction.user.id.to_string() {
            let _ = interaction
                .create_response(
                    &ctx.http,
                    CreateInteractionResponse::Message(
                        CreateInteractionResponseMessage::new()
                            .content("Only the original requester can edit this meeting.")
                            .ephemeral(true),
                    ),
                )
                .await;
            return;
        }

        let prefill = match Tz::from_str(&draft.timezone) {
            Ok(tz) => format!(
                "{} | {} | {}",
                draft.title,
                draft.start_at.with_timezone(&tz).format("%Y-%m-%d %H:%M"),
                draft.duration_min
            ),
            Err(_) => format!(
                "{} | {} | {}",
                draft.title,
                draft.start_at.format("%Y-%m-%d %H:%M"),
                draft.duration_min
            ),
        };
        let modal = CreateModal::new(format!("meet_edit_modal:{}", token), "Edit meeting")
            .components(vec![CreateActionRow::InputText(
                CreateInputText::new(
                    InputTextStyle::Paragraph,
                    "Title | YYYY-MM-DD HH:MM | minutes",
                    "draft",
                )
                .value(prefill)
                .required(true),
            )]);
        let _ = interaction
            .create_response(&ctx.http, CreateInteractionResponse::Modal(modal))
            .await;
    }

    async fn handle_voice_note(&self, ctx: &Context, msg: &Message, audio: &[u8]) {
        let transcript = match self.stt.transcribe(audio).await {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "transcription failed");
                let _ = msg
                    .channel_id
                    .say(&ctx.http, "Couldn't transcribe that voice note.")
                    .await;
                return;
            }
        };
        if transcript.trim().is_empty() {
            let _ = msg
                .channel_id
                .say(&ctx.http, "The voice note came back empty.")
                .await;
            return;
        }

        if let Ok(summary) = self.extractor.summarize(&transcript).await {
            let _ = msg
                .channel_id
                .say(&ctx.http, format!("Summary: {}", summary))
                .await;
        }

        match create_meeting_drafts(
            self.extractor.as_ref(),
            &transcript,
            &msg.author.id.to_string(),
            &msg.channel_id.to_string(),
            Utc::now(),
        )
        .await
        {
            Ok(drafts) if drafts.is_empty() => {
                let _ = msg
                    .channel_id
                    .say(&ctx.http, "No meetings found in that voice note.")
                    .await;
            }
            Ok(drafts) => {
                self.publish_drafts(ctx, msg.channel_id, drafts).await;
            }
            Err(err) => {
                error!(error = %err, "meeting extraction failed");
                let _ = msg
                    .channel_id
                    .say(&ctx.http, "Failed to extract meetings from that voice note.")
                    .await;
            }
        }
    }
}

#[async_trait]
impl EventHandler for BotHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "connected to Discord");

        let commands = vec![
            CreateCommand::new("link").description("Connect your Google Calendar"),
            CreateCommand::new("meetings").description("List your upcoming meetings"),
            CreateCommand::new("plan")
                .description("Turn a note into meeting proposals")
                .add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        "text",
                        "What should go on the calendar?",
                    )
                    .required(true),
                ),
        ];
        for builder in commands {
            let _ = Command::create_global_command(&ctx.http, builder).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        for attachment in &msg.attachments {
            let is_audio = attachment
                .content_type
                .as_deref()
                .map(|ct| ct.starts_with("audio/") || ct.starts_with("video/"))
                .unwrap_or(false);
            if !is_audio {
                continue;
            }
            match attachment.download().await {
                Ok(bytes) => {
                    self.handle_voice_note(&ctx, &msg, &bytes).await;
                }
                Err(err) => {
                    error!(error = %err, "failed to download voice note");
                }
            }
            break;
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: DiscordInteraction) {
        match interaction {
            DiscordInteraction::Command(command) => match command.data.name.as_str() {
                "link" => self.handle_link(&ctx, command).await,
                "meetings" => self.handle_meetings(&ctx, command).await,
                "plan" => self.handle_plan(&ctx, command).await,
                _ => {}
            },
            DiscordInteraction::Component(component) => {
                let custom_id = component.data.custom_id.clone();
                match CallbackAction::decode(&custom_id) {
                    Some(CallbackAction::Snooze {
                        notification_id,
                        minutes,
                    }) => {
                        self.handle_snooze(&ctx, component, notification_id, minutes)
                            .await;
                    }
                    Some(CallbackAction::Acknowledge { notification_id }) => {
                        self.handle_acknowledge(&ctx, component, notification_id)
                            .await;
                    }
                    Some(CallbackAction::ConfirmMeeting { token }) => {
                        self.handle_draft_confirm(&ctx, component, &token).await;
                    }
                    Some(CallbackAction::CancelMeeting { token }) => {
                        self.handle_draft_cancel(&ctx, component, &token).await;
                    }
                    Some(CallbackAction::EditMeeting { token }) => {
                        self.handle_draft_edit(&ctx, component, &token).await;
                    }
                    None => {}
                }
            }
            other => {
                let Some(modal) = other.modal_submit() else {
                    return;
                };
                let custom_id = modal.data.custom_id.as_str();
                let Some(("meet_edit_modal", token)) = custom_id.split_once(':') else {
                    return;
                };

                let mut raw_value: Option<String> = None;
                for row in &modal.data.components {
                    for component in &row.components {
                        if let serenity::all::ActionRowComponent::InputText(input) = component {
                            if input.custom_id == "draft" {
                                raw_value = Some(input.value.clone().unwrap_or_default());
                            }
                        }
                    }
                }
                let Some(raw_value) = raw_value else {
                    return;
                };

                let now = Utc::now();
                let maybe_draft = {
                    let mut drafts = self.drafts.lock().await;
                    drafts.get(token, now)
                };
                let Some(mut draft) = maybe_draft else {
                    let _ = modal
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .content("This proposal has expired.")
                                    .ephemeral(true),
                            ),
                        )
                        .await;
                    return;
                };

                if draft.discord_user_id != modal.user.id.to_string() {
                    let _ = modal
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .content("Only the original requester can edit this meeting.")
                                    .ephemeral(true),
                            ),
                        )
                        .await;
                    return;
                }

                let parts: Vec<&str> = raw_value.split('|').map(str::trim).collect();
                let parsed = if parts.len() == 3 {
                    parts[2]
                        .parse::<i64>()
                        .ok()
                        .map(|minutes| (parts[0], parts[1], minutes))
                } else {
                    None
                };
                let Some((title, start_local, minutes)) = parsed else {
                    let _ = modal
                        .create_response(
                            &ctx.http,
                            CreateInteractionResponse::Message(
                                CreateInteractionResponseMessage::new()
                                    .content("Use the format `Title | YYYY-MM-DD HH:MM | minutes`.")
                                    .ephemeral(true),
                            ),
                        )
                        .await;
                    return;
                };

                match validate_draft(title, start_local, &draft.timezone, minutes) {
                    Ok((start_at, _end)) => {
                        draft.title = title.to_string();
                        draft.start_at = start_at;
                        draft.duration_min = minutes;
                        let preview = render_draft_preview(&draft);
                        {
                            let mut drafts = self.drafts.lock().await;
                            drafts.put(token, draft);
                        }
                        let _ = modal
                            .create_response(
                                &ctx.http,
                                CreateInteractionResponse::UpdateMessage(
                                    CreateInteractionResponseMessage::new()
                                        .content(preview)
                                        .components(vec![draft_buttons(token)]),
                                ),
                            )
                            .await;
                    }
                    Err(err) => {
                        let _ = modal
                            .create_response(
                                &ctx.http,
                                CreateInteractionResponse::Message(
                                    CreateInteractionResponseMessage::new()
                                        .content(format!("Couldn't apply the edit: {}", err))
                                        .ephemeral(true),
                                ),
                            )
                            .await;
                    }
                }
            }
        }
    }
}
