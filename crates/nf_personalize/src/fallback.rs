use chrono::{DateTime, Utc};
use nf_core::{Article, ArticleQuery, ArticleStore, FeedSource, RecommendationItem, Result};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::config::PersonalizeConfig;

const CREDIBILITY_WEIGHT: f32 = 0.6;
const RECENCY_WEIGHT: f32 = 0.4;
const SECONDS_PER_DAY: f32 = 86_400.0;

struct Bucket {
    category: Option<&'static str>,
    take: usize,
}

/// Fixed bucket layout for users without enough history: a broad headline
/// block followed by three category slices.
const BUCKETS: &[Bucket] = &[
    Bucket {
        category: None,
        take: 8,
    },
    Bucket {
        category: Some("business"),
        take: 4,
    },
    Bucket {
        category: Some("technology"),
        take: 4,
    },
    Bucket {
        category: Some("sports"),
        take: 4,
    },
];

/// Builds the deterministic cold-start feed. No provider calls, templated
/// reasons only.
pub struct FallbackComposer {
    articles: Arc<dyn ArticleStore>,
    freshness_scale_days: f32,
}

impl FallbackComposer {
    pub fn new(articles: Arc<dyn ArticleStore>, config: &PersonalizeConfig) -> Self {
        Self {
            articles,
            freshness_scale_days: config.freshness_scale_days,
        }
    }

    pub async fn compose(&self, limit: usize) -> Result<Vec<RecommendationItem>> {
        let now = Utc::now();
        let mut items = Vec::new();
        let mut picked_ids = HashSet::new();

        for bucket in BUCKETS {
            let query = ArticleQuery {
                category: bucket.category.map(str::to_string),
                exclude_ids: Vec::new(),
                limit: None,
            };
            let mut articles = self.articles.query_articles(&query).await?;
            articles.sort_by(|a, b| {
                self.bucket_score(b, now)
                    .partial_cmp(&self.bucket_score(a, now))
                    .unwrap_or(Ordering::Equal)
            });

            let mut taken = 0;
            for article in articles {
                if taken >= bucket.take {
                    break;
                }
                // an article landing in several buckets keeps its first slot
                if !picked_ids.insert(article.id.clone()) {
                    continue;
                }
                let score = self.bucket_score(&article, now);
                items.push(RecommendationItem {
                    article_id: article.id.clone(),
                    category: article.category.clone(),
                    score,
                    reason: bucket_reason(bucket, &article),
                    confidence: (score * 0.5).clamp(0.0, 1.0),
                    source: FeedSource::Fallback,
                });
                taken += 1;
            }
        }

        debug!("composed {} fallback items across {} buckets", items.len(), BUCKETS.len());
        items.truncate(limit);
        Ok(items)
    }

    fn bucket_score(&self, article: &Article, now: DateTime<Utc>) -> f32 {
        let credibility = (article.credibility_score / 100.0).clamp(0.0, 1.0);
        let age_days =
            ((now - article.published_at).num_seconds() as f32 / SECONDS_PER_DAY).max(0.0);
        let recency = (-age_days / self.freshness_scale_days).exp().clamp(0.0, 1.0);
        (CREDIBILITY_WEIGHT * credibility + RECENCY_WEIGHT * recency).clamp(0.0, 1.0)
    }
}

fn bucket_reason(bucket: &Bucket, article: &Article) -> String {
    match bucket.category {
        Some(_) => format!("Popular in {} right now", article.category),
        None => "Making headlines right now".to_string(),
    }
}
