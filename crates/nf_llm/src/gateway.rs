use nf_core::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::providers::{Completion, CompletionRequest, ProviderSlot};
use crate::{Confidence, GenerateOptions, LlmResponse, SourceDoc};

/// Error-text signatures that mark a failure as transient. Anything outside
/// this set (and outside 5xx/timeout/rate-limit status classification) is
/// surfaced immediately instead of masked by the fallback chain.
const RETRYABLE_SIGNATURES: &[&str] = &[
    "timed out",
    "timeout",
    "rate limit",
    "too many requests",
    "service unavailable",
    "temporarily unavailable",
    "couldn't generate",
    "could not generate",
    "overloaded",
    "connection reset",
    "connection refused",
];

const CACHE_KEY_PREFIX_LEN: usize = 160;

pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Provider { retryable, .. } => *retryable,
        Error::Http(err) => {
            err.is_timeout()
                || err.is_connect()
                || err
                    .status()
                    .map_or(false, |s| s.is_server_error() || s.as_u16() == 429)
        }
        other => {
            let text = other.to_string().to_lowercase();
            RETRYABLE_SIGNATURES.iter().any(|sig| text.contains(sig))
        }
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub max_extract_sentences: usize,
    /// Preferred model when a request names none. Resolved against each
    /// provider's capability table, so a model the provider does not serve
    /// still lands on that provider's default.
    pub default_model: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 512,
            cache_ttl: Duration::from_secs(3600),
            max_extract_sentences: 3,
            default_model: None,
        }
    }
}

struct CacheSlot {
    response: LlmResponse,
    stored_at: Instant,
}

/// Bounded per-process response cache keyed by (provider, model, prompt
/// prefix). Insertion-order eviction once capacity is reached.
struct ResponseCache {
    entries: HashMap<String, CacheSlot>,
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl ResponseCache {
    fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity,
            ttl,
        }
    }

    fn get(&mut self, key: &str) -> Option<LlmResponse> {
        match self.entries.get(key) {
            Some(slot) if slot.stored_at.elapsed() < self.ttl => Some(slot.response.clone()),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&mut self, key: String, response: LlmResponse) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.entries.insert(
            key,
            CacheSlot {
                response,
                stored_at: Instant::now(),
            },
        );
        while self.entries.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

fn cache_key(provider: &str, model: &str, prompt: &str) -> String {
    let prefix: String = prompt.chars().take(CACHE_KEY_PREFIX_LEN).collect();
    format!("{}::{}::{}", provider, model, prefix)
}

/// Single front for every text-generation call: ordered provider failover,
/// response caching, and a provider-free extractive fallback. Once a request
/// passes validation the gateway always produces a response, except for a
/// non-retryable primary failure, which propagates untouched.
pub struct Gateway {
    slots: Vec<ProviderSlot>,
    cache: Mutex<ResponseCache>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(slots: Vec<ProviderSlot>, config: GatewayConfig) -> Self {
        let cache = Mutex::new(ResponseCache::new(config.cache_capacity, config.cache_ttl));
        Self {
            slots,
            cache,
            config,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        sources: &[SourceDoc],
    ) -> Result<LlmResponse> {
        if prompt.trim().is_empty() {
            return Err(Error::Validation("prompt must not be empty".to_string()));
        }

        let timeout = Duration::from_secs(options.timeout_secs.max(1));

        let requested_model = options
            .model
            .as_deref()
            .or(self.config.default_model.as_deref());

        for (index, slot) in self.slots.iter().enumerate() {
            let model = slot.kind.resolve_model(requested_model).to_string();
            let key = cache_key(slot.provider.name(), &model, prompt);

            if let Some(mut hit) = self.cache.lock().await.get(&key) {
                info!("💾 Response cache hit for {}", slot.provider.name());
                hit.request_id = Uuid::new_v4().to_string();
                return Ok(hit);
            }

            let request = CompletionRequest {
                model,
                prompt: prompt.to_string(),
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            };

            match self.try_provider(slot, &request, timeout).await {
                Ok(completion) => {
                    let response = LlmResponse {
                        text: completion.text,
                        provider_used: slot.provider.name().to_string(),
                        tokens_used: completion.tokens_used,
                        confidence: if index == 0 {
                            Confidence::High
                        } else {
                            Confidence::Med
                        },
                        provider_fallback_used: index > 0,
                        request_id: Uuid::new_v4().to_string(),
                    };
                    self.cache.lock().await.put(key, response.clone());
                    return Ok(response);
                }
                Err(err) if is_retryable(&err) => {
                    warn!(
                        "⚠️ Provider {} failed ({}), trying next in chain",
                        slot.provider.name(),
                        err
                    );
                }
                Err(err) => {
                    if index == 0 {
                        return Err(err);
                    }
                    warn!(
                        "⚠️ Fallback provider {} failed permanently: {}",
                        slot.provider.name(),
                        err
                    );
                    break;
                }
            }
        }

        info!("📄 All providers exhausted, using extractive fallback");
        Ok(self.extractive_fallback(sources))
    }

    async fn try_provider(
        &self,
        slot: &ProviderSlot,
        request: &CompletionRequest,
        timeout: Duration,
    ) -> Result<Completion> {
        match tokio::time::timeout(timeout, slot.provider.complete(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Provider {
                message: format!(
                    "{} timed out after {}s",
                    slot.provider.name(),
                    timeout.as_secs()
                ),
                retryable: true,
            }),
        }
    }

    /// Provider-free degradation path: stitch together leading sentences
    /// from the supplied source excerpts.
    fn extractive_fallback(&self, sources: &[SourceDoc]) -> LlmResponse {
        let mut sentences = Vec::new();
        'outer: for source in sources {
            for sentence in split_sentences(&source.excerpt) {
                sentences.push(sentence);
                if sentences.len() >= self.config.max_extract_sentences {
                    break 'outer;
                }
            }
        }

        let text = if sentences.is_empty() {
            "Generation is temporarily unavailable. Please try again later.".to_string()
        } else {
            sentences.join(" ")
        };

        LlmResponse {
            text,
            provider_used: "extractive".to_string(),
            tokens_used: 0,
            confidence: Confidence::Low,
            provider_fallback_used: true,
            request_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.entries.len()
    }
}

fn split_sentences(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_inclusive(['.', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
