use async_trait::async_trait;
use nf_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Completion, CompletionRequest, TextProvider};

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

pub struct DeepSeekProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl DeepSeekProvider {
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| "https://api.deepseek.com/v1".to_string());
        url::Url::parse(&base_url).map_err(|_| Error::InvalidUrl(base_url.clone()))?;
        Ok(Self {
            client: Client::new(),
            api_key: api_key.unwrap_or_default(),
            base_url,
        })
    }
}

impl fmt::Debug for DeepSeekProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeekProvider")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "deepseek"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                message: format!("deepseek returned {}: {}", status, detail),
                retryable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let parsed = response.json::<ChatResponse>().await?;
        let choice = parsed.choices.into_iter().next().ok_or_else(|| Error::Provider {
            message: "deepseek returned no choices".to_string(),
            retryable: true,
        })?;

        Ok(Completion {
            text: choice.message.content,
            tokens_used: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}
