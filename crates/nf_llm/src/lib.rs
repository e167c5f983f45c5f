use serde::{Deserialize, Serialize};

pub mod gateway;
pub mod providers;

pub use gateway::{Gateway, GatewayConfig};
pub use providers::{
    create_provider, Completion, CompletionRequest, ProviderKind, ProviderSlot, TextProvider,
};

/// Which provider tier produced a response. High means the primary provider
/// answered, Med the fallback provider, Low the extractive fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Med,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider_used: String,
    pub tokens_used: u32,
    pub confidence: Confidence,
    pub provider_fallback_used: bool,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 256,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

/// A reference document handed to generation calls. The excerpt feeds the
/// extractive fallback when every provider is down.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDoc {
    pub title: Option<String>,
    pub excerpt: String,
}

pub mod prelude {
    pub use super::{Confidence, Gateway, GenerateOptions, LlmResponse, SourceDoc};
    pub use super::{ProviderKind, ProviderSlot, TextProvider};
}
