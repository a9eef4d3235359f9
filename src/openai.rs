// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! OpenAI chat completions client for image evaluation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::OpenAiConfig;
use crate::evaluation::TokenUsage;
use crate::vision::{ImageDetail, VisionModel, VisionRequest, VisionResponse};
use crate::{Result, SorterError};

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: ImageDetail,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

impl OpenAiClient {
    /// Create a client from the `openai` config section and a resolved key
    pub fn new(config: &OpenAiConfig, api_key: String) -> Result<Self> {
        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder.build()?;

        let base_url = config
            .base_url
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions")
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
        })
    }

    /// Check that the endpoint is reachable and the key is accepted
    pub async fn health_check(&self) -> Result<()> {
        self.list_models().await.map(|_| ())
    }

    /// List model ids visible to this key
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let models: ModelList = response.json().await?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl VisionModel for OpenAiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &VisionRequest<'_>) -> Result<VisionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: request.prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: format!(
                                "data:{};base64,{}",
                                request.mime_type, request.image_base64
                            ),
                            detail: request.detail,
                        },
                    },
                ],
            }],
            max_tokens: request.max_tokens,
        };

        debug!(
            "Sending vision request: model={} detail={} max_tokens={}",
            self.model, request.detail, request.max_tokens
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let chat: ChatResponse = response.json().await?;
        let usage = chat
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SorterError::Provider("Response contained no message content".to_string()))?;

        debug!("Received {} chars, {} tokens", text.len(), usage.total_tokens);

        Ok(VisionResponse {
            text: text.trim().to_string(),
            usage,
        })
    }
}

/// Provider error carrying the status and the API's own message when present
async fn error_from_response(response: reqwest::Response) -> SorterError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    SorterError::Provider(format!("OpenAI returned status {}: {}", status, message))
}
