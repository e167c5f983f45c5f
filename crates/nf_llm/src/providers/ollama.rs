use async_trait::async_trait;
use nf_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Completion, CompletionRequest, TextProvider};

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: ModelOptions,
}

#[derive(Serialize)]
struct ModelOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    eval_count: Option<u32>,
    prompt_eval_count: Option<u32>,
}

/// Local Ollama daemon client.
pub struct OllamaProvider {
    client: Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:11434".to_string());
        url::Url::parse(&base_url).map_err(|_| Error::InvalidUrl(base_url.clone()))?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }
}

impl fmt::Debug for OllamaProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaProvider")
            .field("client", &"<reqwest::Client>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl TextProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = GenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            options: ModelOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Provider {
                message: format!("ollama returned {}: {}", status, detail),
                retryable: status.is_server_error() || status.as_u16() == 429,
            });
        }

        let parsed = response.json::<GenerateResponse>().await?;
        let tokens_used =
            parsed.eval_count.unwrap_or(0) + parsed.prompt_eval_count.unwrap_or(0);

        Ok(Completion {
            text: parsed.response,
            tokens_used,
        })
    }
}
