use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

use super::{check_response, AiError, SpeechSynthesizer};
use crate::gcp::TokenProvider;

const SYNTHESIZE_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Cloud Text-to-Speech with a fixed English voice and MP3 output.
pub struct TtsClient {
    client: Client,
    auth: Arc<TokenProvider>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

impl TtsClient {
    pub fn new(client: Client, auth: Arc<TokenProvider>) -> Self {
        Self { client, auth }
    }
}

fn synthesize_request(text: &str) -> serde_json::Value {
    serde_json::json!({
        "input": { "text": text },
        "voice": { "languageCode": "en-US", "ssmlGender": "NEUTRAL" },
        "audioConfig": { "audioEncoding": "MP3" },
    })
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> Result<Bytes, AiError> {
        let token = self.auth.token().await?;

        let resp = self
            .client
            .post(SYNTHESIZE_URL)
            .bearer_auth(&token)
            .json(&synthesize_request(text))
            .send()
            .await?;

        let resp: SynthesizeResponse = check_response("Text-to-Speech", resp)
            .await?
            .json()
            .await?;

        let audio = base64::engine::general_purpose::STANDARD
            .decode(resp.audio_content)
            .map_err(|e| AiError::InvalidResponse(format!("audioContent is not base64: {e}")))?;

        Ok(Bytes::from(audio))
    }
}
