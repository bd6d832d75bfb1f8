use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{check_response, AiError, TextGenerator};
use crate::config::GeminiConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client. One prompt, one response, no streaming.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(client: Client, config: &GeminiConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{API_BASE}/models/{model}:generateContent")
    }
}

/// Text of the first candidate, parts concatenated and trimmed.
fn response_text(resp: &GenerateResponse) -> String {
    resp.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [RequestPart { text: prompt }],
            }],
        };

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let resp: GenerateResponse = check_response("Gemini", resp).await?.json().await?;
        let text = response_text(&resp);

        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.len(),
            response_chars = text.len(),
            "Gemini generation complete"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn joins_and_trims_first_candidate() {
        let resp = parse(
            r#"{"candidates": [
                {"content": {"parts": [{"text": "  Key points:\n"}, {"text": "- one\n\n"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]}"#,
        );
        assert_eq!(response_text(&resp), "Key points:\n- one");
    }

    #[test]
    fn blocked_or_empty_response_is_empty_string() {
        assert_eq!(response_text(&parse(r#"{"candidates": []}"#)), "");
        assert_eq!(response_text(&parse(r#"{}"#)), "");
        assert_eq!(
            response_text(&parse(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)),
            ""
        );
    }

    #[test]
    fn endpoint_accepts_prefixed_model_names() {
        let config = GeminiConfig {
            api_key: "k".to_string(),
            model: "models/gemini-1.5-flash".to_string(),
        };
        let client = GeminiClient::new(Client::new(), &config);
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
