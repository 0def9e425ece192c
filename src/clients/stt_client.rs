use serde::Deserialize;
use serenity::async_trait;

/// Speech recognition boundary: audio bytes in, transcript out.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(
        &self,
        audio: &[u8],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Debug, Deserialize)]
struct SttResponse {
    text: String,
}

/// Client for a self-hosted recognition server exposing POST /transcribe.
pub struct HttpSttClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSttClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpeechToText for HttpSttClient {
    async fn transcribe(
        &self,
        audio: &[u8],
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let response = self
            .client
            .post(format!("{}/transcribe", self.base_url))
            .header("Content-Type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("STT request failed with status {}", status).into());
        }
        let parsed: SttResponse = response.json().await?;
        Ok(parsed.text)
    }
}
