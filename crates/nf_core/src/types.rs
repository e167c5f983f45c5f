use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub url: String,
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub published_at: DateTime<Utc>,
    pub source: String,
    /// Editorial credibility rating, 0-100.
    pub credibility_score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionAction {
    View,
    ReadComplete,
    Save,
    Share,
    Summarize,
    Qa,
    Note,
}

impl InteractionAction {
    /// Fixed engagement weight per action. Static configuration, never
    /// derived at runtime.
    pub fn weight(&self) -> f32 {
        match self {
            Self::View => 1.0,
            Self::ReadComplete => 2.0,
            Self::Save => 3.0,
            Self::Share => 2.5,
            Self::Note => 2.5,
            Self::Summarize => 1.5,
            Self::Qa => 1.5,
        }
    }

    /// Whether the action counts as positive engagement for the
    /// collaborative signal.
    pub fn is_positive(&self) -> bool {
        matches!(self, Self::ReadComplete | Self::Save | Self::Share)
    }
}

/// A single user interaction event. Append-only; immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: String,
    pub article_id: String,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
    pub duration_seconds: Option<f32>,
    pub session_id: String,
}

/// Derived view of a user's interaction history. Recomputed per request;
/// never persisted as authoritative state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub category_weights: HashMap<String, f32>,
    pub keyword_weights: HashMap<String, f32>,
    /// Category and keyword terms from positively-engaged articles only,
    /// unnormalized. Feeds the collaborative signal.
    pub positive_keyword_weights: HashMap<String, f32>,
    /// Per-category engagement decayed with a short half-life. Feeds the
    /// behavior boost.
    pub category_engagement: HashMap<String, f32>,
    pub seen_article_ids: HashSet<String>,
    pub recency_decayed_engagement: f32,
    pub total_interactions: usize,
}

impl UserProfile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            category_weights: HashMap::new(),
            keyword_weights: HashMap::new(),
            positive_keyword_weights: HashMap::new(),
            category_engagement: HashMap::new(),
            seen_article_ids: HashSet::new(),
            recency_decayed_engagement: 0.0,
            total_interactions: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    Personalized,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub article_id: String,
    pub category: String,
    pub score: f32,
    pub reason: String,
    pub confidence: f32,
    pub source: FeedSource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedMetadata {
    pub total_count: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub items: Vec<RecommendationItem>,
    pub source: FeedSource,
    pub metadata: FeedMetadata,
}
