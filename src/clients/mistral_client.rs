use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

pub async fn generate_mistral_prompt(
    prompt: &str,
    prompt_type: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let now: DateTime<Utc> = Utc::now();

    let full_prompt = match prompt_type {
        "meeting_suggestions" => format!(
            "You are a meeting planner.\n\
             Current date and time (UTC): {now}\n\
             Task: From the transcript below, propose the meetings that are EXPLICITLY discussed.\n\
             For each meeting produce:\n\
             - \"title\": a short clear title\n\
             - \"start_local\": \"YYYY-MM-DD HH:MM\" in the stated timezone; if no date is named, pick the nearest reasonable one on or after the current date\n\
             - \"timezone\": an IANA timezone name; use \"UTC\" when the transcript names none\n\
             - \"duration_min\": one of 15, 30, 45, 60\n\
             Rules:\n\
             - Do not invent meetings that are not in the transcript.\n\
             - Output ONLY a raw JSON array, no prose, markdown, or code fences.\n\
             - Each element must be exactly:\n\
             {{\"title\":\"...\",\"start_local\":\"YYYY-MM-DD HH:MM\",\"timezone\":\"UTC\",\"duration_min\":30}}\n\
             Transcript:\n{user_prompt}",
            now = now.to_rfc3339(),
            user_prompt = prompt
        ),
        "summary" => format!(
            "You strictly extract facts from a transcript. DO NOT INVENT ANYTHING.\n\
             Current date and time (UTC): {now}\n\
             Task:\n\
             1) Summary: a restatement with no added details.\n\
             2) List only explicit action items (who and what, optionally when).\n\
             3) If there are no explicit action items, write \"Tasks: none stated\".\n\
             Return plain text in this shape:\n\
             Summary: <short text>\n\
             Tasks:\n\
             - <owner>: <short wording>\n\
             Transcript:\n{user_prompt}",
            now = now.to_rfc3339(),
            user_prompt = prompt
        ),
        _ => return Err("Not a valid base prompt".to_string().into()),
    };

    query_mistral(full_prompt, prompt_type, api_key).await
}

async fn query_mistral(
    prompt: String,
    prompt_type: &str,
    api_key: &str,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let system_message = match prompt_type {
        "meeting_suggestions" => {
            "You are a strict JSON meeting extraction engine. You reply ONLY with a single JSON array, with no markdown, no backticks, and no extra text. You never propose a meeting the transcript does not contain."
        }
        "summary" => {
            "You are a strict factual summarizer. Reply with plain text only (no JSON, no markdown)."
        }
        _ => "You are a helpful assistant.",
    };

    let request = ChatRequest {
        model: "mistral-medium-latest".to_string(),
        messages: vec![
            ChatMessage {
                role: "system".to_string(),
                content: system_message.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: prompt,
            },
        ],
        max_tokens: 1500,
        temperature: 0.2,
    };

    let client = reqwest::Client::new();
    let response = client
        .post("https://api.mistral.ai/v1/chat/completions")
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        tracing::warn!(%status, body = %text, "mistral request failed");
        return Err(format!("Request failed with status {}", status).into());
    }

    let parsed: ChatResponse = serde_json::from_str(&text)
        .map_err(|e| format!("Failed to parse JSON: {}\nRaw body: {}", e, text))?;

    if let Some(choice) = parsed.choices.first() {
        Ok(choice.message.content.clone())
    } else {
        Err("No response from Mistral".to_string().into())
    }
}
