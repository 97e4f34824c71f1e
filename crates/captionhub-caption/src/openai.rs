//! OpenAI Chat Completions caption generator

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use captionhub_core::{CaptionConfig, CaptionGenerator, IngestError, IngestResult, PendingFile};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

pub const ALT_TEXT_SYSTEM_PROMPT: &str =
    "Generate a concise alt text (max 150 characters) for the given image based on its content.";
pub const ALT_TEXT_USER_PROMPT: &str = "Describe this image in less than 150 characters.";

/// Caption generator backed by a vision-capable chat completion model
pub struct OpenAiCaptionGenerator {
    http_client: reqwest::Client,
    config: CaptionConfig,
}

impl Debug for OpenAiCaptionGenerator {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("OpenAiCaptionGenerator")
            .field("model", &self.config.model)
            .finish()
    }
}

// Chat Completions request/response structures
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
enum ChatMessage {
    System { content: String },
    User { content: Vec<ContentPart> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiCaptionGenerator {
    pub fn new(config: &CaptionConfig, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for OpenAI API")?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, file: &PendingFile) -> ChatCompletionRequest {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(file.data());

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::System {
                    content: ALT_TEXT_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage::User {
                    content: vec![
                        ContentPart::Text {
                            text: ALT_TEXT_USER_PROMPT.to_string(),
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!(
                                    "data:{};base64,{}",
                                    file.content_type(),
                                    image_base64
                                ),
                            },
                        },
                    ],
                },
            ],
            max_tokens: self.config.max_tokens,
        }
    }

    /// Request a caption from the Chat Completions API
    async fn request_caption(&self, file: &PendingFile) -> Result<String> {
        let body = self.build_request(file);

        tracing::debug!(
            model = %self.config.model,
            file_name = %file.file_name(),
            image_size = file.size(),
            "Sending caption request to OpenAI API"
        );

        let response = self
            .http_client
            .post(self.completions_url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(api_error(status, &error_text));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        if let Some(usage) = &chat_response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI caption usage"
            );
        }

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|s| s.trim().to_string())
            .context("No caption in OpenAI API response")
    }
}

/// Prefer OpenAI's structured error message when the body carries one.
fn api_error(status: reqwest::StatusCode, error_text: &str) -> anyhow::Error {
    if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(error_text) {
        if let Some(error_obj) = error_json.get("error") {
            let error_message = error_obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown OpenAI error");
            let error_type = error_obj
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("api_error");
            return anyhow::anyhow!(
                "OpenAI API error ({}): {} - Status: {}",
                error_type,
                error_message,
                status
            );
        }
    }

    anyhow::anyhow!("OpenAI API request failed: {} - {}", status, error_text)
}

#[async_trait]
impl CaptionGenerator for OpenAiCaptionGenerator {
    async fn generate(&self, file: &PendingFile) -> IngestResult<String> {
        let caption = self
            .request_caption(file)
            .await
            .map_err(IngestError::caption)?;

        tracing::info!(
            file_name = %file.file_name(),
            caption_length = caption.chars().count(),
            "Generated caption"
        );
        Ok(caption)
    }
}
