use nf_core::{Article, UserProfile};
use nf_llm::{Confidence, Gateway, GenerateOptions};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::warn;

use crate::config::PersonalizeConfig;
use crate::scoring::{ScoreBreakdown, ScoredCandidate, Signal};

const MAX_REASON_WORDS: usize = 15;

/// Produces the per-item "why this article" line. Cheap templated reasons
/// for low-confidence items, a short provider call for the rest, and a
/// deterministic template whenever the gateway degrades. Always returns a
/// non-empty string.
pub struct ReasonGenerator {
    gateway: Arc<Gateway>,
    confidence_threshold: f32,
    max_tokens: u32,
}

impl ReasonGenerator {
    pub fn new(gateway: Arc<Gateway>, config: &PersonalizeConfig) -> Self {
        Self {
            gateway,
            confidence_threshold: config.reason_confidence_threshold,
            max_tokens: config.reason_max_tokens,
        }
    }

    pub async fn explain(&self, profile: &UserProfile, scored: &ScoredCandidate) -> String {
        if scored.score <= self.confidence_threshold {
            return template_reason(&scored.breakdown, &scored.article);
        }

        let prompt = build_prompt(profile, &scored.article);
        let options = GenerateOptions {
            max_tokens: self.max_tokens,
            temperature: 0.4,
            ..Default::default()
        };

        match self.gateway.generate(&prompt, &options, &[]).await {
            Ok(response) if response.confidence != Confidence::Low => {
                let cleaned = clean_reason(&response.text);
                if cleaned.is_empty() {
                    template_reason(&scored.breakdown, &scored.article)
                } else {
                    cleaned
                }
            }
            Ok(_) => template_reason(&scored.breakdown, &scored.article),
            Err(err) => {
                warn!(
                    "⚠️ Reason generation failed for {}: {}",
                    scored.article.id, err
                );
                template_reason(&scored.breakdown, &scored.article)
            }
        }
    }
}

fn build_prompt(profile: &UserProfile, article: &Article) -> String {
    let mut interests: Vec<(&String, &f32)> = profile.category_weights.iter().collect();
    interests.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(Ordering::Equal));
    let top: Vec<&str> = interests.iter().take(3).map(|(c, _)| c.as_str()).collect();
    let interests = if top.is_empty() {
        "general news".to_string()
    } else {
        top.join(", ")
    };

    format!(
        "In one sentence of at most 12 words, tell a reader interested in {} \
         why the {} article \"{}\" is worth reading. Answer with the sentence only.",
        interests, article.category, article.title
    )
}

/// Truncate provider output to a single short sentence.
fn clean_reason(text: &str) -> String {
    let first_sentence = text
        .trim()
        .split_inclusive(['.', '!', '?'])
        .next()
        .unwrap_or("");
    let words: Vec<&str> = first_sentence.split_whitespace().take(MAX_REASON_WORDS).collect();
    words.join(" ").trim_matches('"').trim().to_string()
}

fn template_reason(breakdown: &ScoreBreakdown, article: &Article) -> String {
    match breakdown.dominant() {
        Signal::Collaborative => {
            format!("Similar to {} stories you engaged with", article.category)
        }
        Signal::Content => format!("Matches your interest in {}", article.category),
        Signal::Behavior => format!("Trending in {} this week", article.category),
        Signal::Freshness => "Recently published and highly rated".to_string(),
    }
}
