use async_trait::async_trait;
use nf_core::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub mod deepseek;
pub mod ollama;

pub use deepseek::DeepSeekProvider;
pub use ollama::OllamaProvider;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

#[async_trait]
pub trait TextProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run a single text completion against the provider.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    DeepSeek,
    Ollama,
}

impl ProviderKind {
    /// Models each provider serves, in preference order. The first entry is
    /// the canonical default.
    pub fn supported_models(&self) -> &'static [&'static str] {
        match self {
            Self::DeepSeek => &["deepseek-chat", "deepseek-reasoner"],
            Self::Ollama => &["llama3.2", "mistral", "qwen2.5"],
        }
    }

    /// Resolve a requested model name against the capability table, falling
    /// back to the provider default when the request names a model this
    /// provider does not serve.
    pub fn resolve_model(&self, requested: Option<&str>) -> &'static str {
        let supported = self.supported_models();
        requested
            .and_then(|r| supported.iter().find(|m| **m == r))
            .copied()
            .unwrap_or(supported[0])
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "deepseek" => Ok(Self::DeepSeek),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Validation(format!(
                "unknown provider: {} (available: deepseek, ollama)",
                other
            ))),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeepSeek => write!(f, "deepseek"),
            Self::Ollama => write!(f, "ollama"),
        }
    }
}

/// A provider paired with its capability-table entry, as wired into the
/// gateway's failover order.
#[derive(Debug, Clone)]
pub struct ProviderSlot {
    pub kind: ProviderKind,
    pub provider: Arc<dyn TextProvider>,
}

pub fn create_provider(
    kind: ProviderKind,
    api_key: Option<String>,
    base_url: Option<String>,
) -> Result<Arc<dyn TextProvider>> {
    match kind {
        ProviderKind::DeepSeek => Ok(Arc::new(DeepSeekProvider::new(api_key, base_url)?)),
        ProviderKind::Ollama => Ok(Arc::new(OllamaProvider::new(base_url)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_resolution() {
        let kind = ProviderKind::DeepSeek;
        assert_eq!(kind.resolve_model(None), "deepseek-chat");
        assert_eq!(kind.resolve_model(Some("deepseek-reasoner")), "deepseek-reasoner");
        // a model another provider serves falls back to the default
        assert_eq!(kind.resolve_model(Some("llama3.2")), "deepseek-chat");
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert!("gpt".parse::<ProviderKind>().is_err());
    }
}
