use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;

use super::{check_response, AiError, ImageLabeler, ImageSource};
use crate::gcp::TokenProvider;

const ANNOTATE_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Cloud Vision label detection.
pub struct VisionClient {
    client: Client,
    auth: Arc<TokenProvider>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    label_annotations: Vec<LabelAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct LabelAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl VisionClient {
    pub fn new(client: Client, auth: Arc<TokenProvider>) -> Self {
        Self { client, auth }
    }
}

fn annotate_request(image: &ImageSource) -> serde_json::Value {
    let image = match image {
        ImageSource::Bytes(data) => serde_json::json!({
            "content": base64::engine::general_purpose::STANDARD.encode(data),
        }),
        ImageSource::Uri(uri) => serde_json::json!({
            "source": { "imageUri": uri },
        }),
    };

    serde_json::json!({
        "requests": [{
            "image": image,
            "features": [{ "type": "LABEL_DETECTION" }],
        }]
    })
}

fn labels_from(resp: AnnotateResponse) -> Result<Vec<String>, AiError> {
    let Some(first) = resp.responses.into_iter().next() else {
        return Ok(Vec::new());
    };

    // Per-image failures (e.g. unreachable image_url) come back inside a 200
    if let Some(status) = first.error.filter(|s| s.code != 0) {
        return Err(AiError::Api {
            service: "Vision",
            status: status.code,
            message: status.message,
        });
    }

    Ok(first
        .label_annotations
        .into_iter()
        .map(|l| l.description)
        .filter(|d| !d.is_empty())
        .collect())
}

#[async_trait]
impl ImageLabeler for VisionClient {
    async fn labels(&self, image: ImageSource) -> Result<Vec<String>, AiError> {
        let token = self.auth.token().await?;

        let resp = self
            .client
            .post(ANNOTATE_URL)
            .bearer_auth(&token)
            .json(&annotate_request(&image))
            .send()
            .await?;

        let resp: AnnotateResponse = check_response("Vision", resp).await?.json().await?;
        labels_from(resp)
    }
}
