use chrono::{DateTime, Utc};
use nf_core::{cosine_similarity, Article, Error, Result, UserProfile};
use std::cmp::Ordering;
use tracing::warn;

use crate::config::PersonalizeConfig;

const W_COLLABORATIVE: f32 = 0.35;
const W_CONTENT: f32 = 0.40;
const W_BEHAVIOR: f32 = 0.15;
const W_FRESHNESS: f32 = 0.10;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// The scoring component that dominated an item's final score. Drives the
/// templated reason fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Collaborative,
    Content,
    Behavior,
    Freshness,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreBreakdown {
    pub collaborative: f32,
    pub content: f32,
    pub behavior: f32,
    pub freshness: f32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f32 {
        (W_COLLABORATIVE * self.collaborative
            + W_CONTENT * self.content
            + W_BEHAVIOR * self.behavior
            + W_FRESHNESS * self.freshness)
            .clamp(0.0, 1.0)
    }

    pub fn dominant(&self) -> Signal {
        let weighted = [
            (Signal::Collaborative, W_COLLABORATIVE * self.collaborative),
            (Signal::Content, W_CONTENT * self.content),
            (Signal::Behavior, W_BEHAVIOR * self.behavior),
            (Signal::Freshness, W_FRESHNESS * self.freshness),
        ];
        weighted
            .iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map(|(signal, _)| *signal)
            .unwrap_or(Signal::Freshness)
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub article: Article,
    pub breakdown: ScoreBreakdown,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct ScoreOptions {
    pub exclude_seen: bool,
    /// Decay factor applied to consecutive same-category picks during the
    /// diversification re-rank. None disables the pass.
    pub diversity_boost: Option<f32>,
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self {
            exclude_seen: true,
            diversity_boost: None,
        }
    }
}

pub struct Scorer {
    freshness_scale_days: f32,
}

impl Scorer {
    pub fn new(config: &PersonalizeConfig) -> Self {
        Self {
            freshness_scale_days: config.freshness_scale_days,
        }
    }

    /// Score candidates for a user, descending by score with ties broken by
    /// credibility then recency. Candidates that fail to score are dropped,
    /// never abort the feed.
    pub fn score(
        &self,
        profile: &UserProfile,
        candidates: &[Article],
        options: &ScoreOptions,
    ) -> Vec<ScoredCandidate> {
        let now = Utc::now();
        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .filter(|a| !(options.exclude_seen && profile.seen_article_ids.contains(&a.id)))
            .filter_map(|article| match self.score_one(profile, article, now) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("⚠️ Dropping candidate {} from scoring: {}", article.id, err);
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.article
                        .credibility_score
                        .partial_cmp(&a.article.credibility_score)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| b.article.published_at.cmp(&a.article.published_at))
        });

        match options.diversity_boost {
            Some(decay) => diversify(scored, decay),
            None => scored,
        }
    }

    fn score_one(
        &self,
        profile: &UserProfile,
        article: &Article,
        now: DateTime<Utc>,
    ) -> Result<ScoredCandidate> {
        if !article.credibility_score.is_finite() {
            return Err(Error::Validation(format!(
                "article {} has a non-finite credibility score",
                article.id
            )));
        }

        let breakdown = ScoreBreakdown {
            collaborative: collaborative_signal(profile, article),
            content: profile
                .category_weights
                .get(&article.category)
                .copied()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            behavior: profile
                .category_engagement
                .get(&article.category)
                .copied()
                .unwrap_or(0.0)
                .clamp(0.0, 1.0),
            freshness: self.freshness(article, now),
        };

        Ok(ScoredCandidate {
            article: article.clone(),
            score: breakdown.total(),
            breakdown,
        })
    }

    pub fn freshness(&self, article: &Article, now: DateTime<Utc>) -> f32 {
        let age_days =
            ((now - article.published_at).num_seconds() as f32 / SECONDS_PER_DAY).max(0.0);
        (-age_days / self.freshness_scale_days).exp().clamp(0.0, 1.0)
    }
}

/// Cosine similarity between the candidate's category+keyword terms and the
/// user's positively-engaged term weights, projected onto the union of both
/// term sets.
fn collaborative_signal(profile: &UserProfile, article: &Article) -> f32 {
    if profile.positive_keyword_weights.is_empty() {
        return 0.0;
    }

    let mut candidate_terms: Vec<&str> =
        article.keywords.iter().map(String::as_str).collect();
    candidate_terms.push(article.category.as_str());

    let mut axes: Vec<&str> = profile
        .positive_keyword_weights
        .keys()
        .map(String::as_str)
        .collect();
    for term in &candidate_terms {
        if !axes.contains(term) {
            axes.push(term);
        }
    }

    let user: Vec<f32> = axes
        .iter()
        .map(|t| {
            profile
                .positive_keyword_weights
                .get(*t)
                .copied()
                .unwrap_or(0.0)
        })
        .collect();
    let candidate: Vec<f32> = axes
        .iter()
        .map(|t| if candidate_terms.contains(t) { 1.0 } else { 0.0 })
        .collect();

    cosine_similarity(&user, &candidate).clamp(0.0, 1.0)
}

/// Maximal-marginal-relevance style re-rank: greedily re-pick the best
/// candidate, multiplying scores of the running category by a penalty that
/// deepens with each consecutive same-category pick.
fn diversify(mut pool: Vec<ScoredCandidate>, decay: f32) -> Vec<ScoredCandidate> {
    let decay = decay.clamp(0.0, 1.0);
    let mut result = Vec::with_capacity(pool.len());
    let mut run_category: Option<String> = None;
    let mut run_penalty = 1.0;

    while !pool.is_empty() {
        let mut best = 0;
        let mut best_score = f32::MIN;
        for (index, candidate) in pool.iter().enumerate() {
            let mut adjusted = candidate.score;
            if run_category.as_deref() == Some(candidate.article.category.as_str()) {
                adjusted *= run_penalty;
            }
            if adjusted > best_score {
                best = index;
                best_score = adjusted;
            }
        }

        let picked = pool.remove(best);
        if run_category.as_deref() == Some(picked.article.category.as_str()) {
            run_penalty *= decay;
        } else {
            run_category = Some(picked.article.category.clone());
            run_penalty = decay;
        }
        result.push(picked);
    }

    result
}
