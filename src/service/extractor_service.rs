use serde::Deserialize;
use serenity::async_trait;

use crate::clients::mistral_client;

/// One meeting proposal as the language model emits it: local wall-clock
/// time plus a timezone name, not yet validated.
#[derive(Debug, Clone, Deserialize)]
pub struct SuggestedMeeting {
    pub title: String,
    pub start_local: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    pub duration_min: i64,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Language-model boundary: transcript in, structured meeting drafts out.
#[async_trait]
pub trait MeetingExtractor: Send + Sync {
    async fn suggest_meetings(
        &self,
        transcript: &str,
    ) -> Result<Vec<SuggestedMeeting>, Box<dyn std::error::Error + Send + Sync>>;

    async fn summarize(
        &self,
        transcript: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct MistralService {
    api_key: String,
}

impl MistralService {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl MeetingExtractor for MistralService {
    async fn suggest_meetings(
        &self,
        transcript: &str,
    ) -> Result<Vec<SuggestedMeeting>, Box<dyn std::error::Error + Send + Sync>> {
        let payload = mistral_client::generate_mistral_prompt(
            transcript,
            "meeting_suggestions",
            &self.api_key,
        )
        .await?;
        let unfenced = unfence(&payload);
        let suggestions: Vec<SuggestedMeeting> = serde_json::from_str(&unfenced)
            .map_err(|e| format!("Failed to parse meeting suggestions: {}", e))?;
        Ok(suggestions)
    }

    async fn summarize(
        &self,
        transcript: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        mistral_client::generate_mistral_prompt(transcript, "summary", &self.api_key).await
    }
}

/// Models occasionally wrap JSON in a markdown fence despite instructions;
/// strip one fenced block if present.
pub fn unfence(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfence_strips_json_fence() {
        let fenced = "```json\n[{\"a\":1}]\n```";
        assert_eq!(unfence(fenced), "[{\"a\":1}]");
    }

    #[test]
    fn unfence_strips_bare_fence() {
        let fenced = "```\n[]\n```";
        assert_eq!(unfence(fenced), "[]");
    }

    #[test]
    fn unfence_leaves_plain_text_alone() {
        assert_eq!(unfence("  [1,2]  "), "[1,2]");
    }

    #[test]
    fn suggestion_parses_with_default_timezone() {
        let raw = "[{\"title\":\"Standup\",\"start_local\":\"2025-09-01 10:00\",\"duration_min\":15}]";
        let parsed: Vec<SuggestedMeeting> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed[0].timezone, "UTC");
        assert_eq!(parsed[0].duration_min, 15);
    }
}
