use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Option<String>,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Why a completion call produced no text.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion endpoint returned status {0}")]
    Status(u16),
    #[error("request to completion endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed completion response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("completion response contained no choices")]
    NoChoices,
    #[error("completion choice had no message content")]
    NoContent,
}

impl LlmError {
    /// Text shown in the channel in place of a completion.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::Status(code) => format!("API Error: {}", code),
            LlmError::Transport(e) => format!("Error: {}", e),
            LlmError::Decode(e) => format!("Error: {}", e),
            LlmError::NoChoices => "Error: no choices in completion response".to_string(),
            LlmError::NoContent => "Error: completion had no content".to_string(),
        }
    }
}

pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send `text` as a single user message and return the first choice's content.
    pub async fn complete(&self, text: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage::user(text)],
        };

        let url = format!("{}/chat/completions", self.config.effective_base_url());

        debug!("Sending request to {}: {}", self.config.provider, url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(LlmError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let chat_response: ChatResponse = serde_json::from_str(&body)?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::NoChoices)?;

        match choice.message.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(LlmError::NoContent),
        }
    }
}
