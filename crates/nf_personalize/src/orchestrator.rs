use chrono::Utc;
use futures::future::join_all;
use nf_core::{
    Article, ArticleQuery, ArticleStore, Error, Feed, FeedMetadata, FeedSource, Interaction,
    InteractionStore, RecommendationItem, Result, UserProfile,
};
use nf_llm::Gateway;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

use crate::cache::FeedCache;
use crate::config::PersonalizeConfig;
use crate::fallback::FallbackComposer;
use crate::profile::ProfileBuilder;
use crate::ratelimit::RateLimiter;
use crate::reasons::ReasonGenerator;
use crate::scoring::{ScoreOptions, ScoredCandidate, Scorer};

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub limit: usize,
    pub categories: Vec<String>,
    /// Free-text locality filter matched against title, content and
    /// keywords.
    pub location: Option<String>,
    pub diversity_boost: Option<f32>,
    pub exclude_seen: bool,
}

impl Default for FeedRequest {
    fn default() -> Self {
        Self {
            limit: 20,
            categories: Vec::new(),
            location: None,
            diversity_boost: None,
            exclude_seen: true,
        }
    }
}

/// Entry point for the personalization pipeline: decides fallback vs
/// personalized mode, attaches reasons, and owns the per-user cache and
/// rate limit.
pub struct Personalizer {
    articles: Arc<dyn ArticleStore>,
    profiles: ProfileBuilder,
    scorer: Scorer,
    fallback: FallbackComposer,
    reasons: ReasonGenerator,
    interactions: Arc<dyn InteractionStore>,
    cache: FeedCache,
    limiter: RateLimiter,
    reason_semaphore: Arc<Semaphore>,
    config: PersonalizeConfig,
}

impl Personalizer {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        interactions: Arc<dyn InteractionStore>,
        gateway: Arc<Gateway>,
        config: PersonalizeConfig,
    ) -> Self {
        Self {
            profiles: ProfileBuilder::new(
                articles.clone(),
                interactions.clone(),
                config.clone(),
            ),
            scorer: Scorer::new(&config),
            fallback: FallbackComposer::new(articles.clone(), &config),
            reasons: ReasonGenerator::new(gateway, &config),
            cache: FeedCache::new(config.cache_capacity),
            limiter: RateLimiter::new(config.rate_limit_per_minute, config.rate_limit_window),
            reason_semaphore: Arc::new(Semaphore::new(config.max_concurrent_reasons.max(1))),
            articles,
            interactions,
            config,
        }
    }

    pub async fn get_feed(&self, user_id: &str, request: &FeedRequest) -> Result<Feed> {
        if user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is required".to_string()));
        }

        if let Some(feed) = self.cache.get(user_id).await {
            info!("💾 Serving cached feed for {}", user_id);
            return Ok(feed);
        }

        self.limiter.check(user_id).await?;

        let profile = self.profiles.build_profile(user_id).await?;
        info!(
            "👤 Profile for {}: {} interactions, {} categories",
            user_id,
            profile.total_interactions,
            profile.category_weights.len()
        );

        let feed = if profile.total_interactions < self.config.min_interactions {
            info!("🧭 Serving fallback feed for {}", user_id);
            let items = self.fallback.compose(request.limit).await?;
            Feed {
                metadata: FeedMetadata {
                    total_count: items.len(),
                    generated_at: Utc::now(),
                },
                source: FeedSource::Fallback,
                items,
            }
        } else {
            let candidates = self.gather_candidates(request).await?;
            info!(
                "🎯 Scoring {} candidates for {}",
                candidates.len(),
                user_id
            );
            let options = ScoreOptions {
                exclude_seen: request.exclude_seen,
                diversity_boost: request.diversity_boost,
            };
            let top: Vec<ScoredCandidate> = self
                .scorer
                .score(&profile, &candidates, &options)
                .into_iter()
                .take(request.limit)
                .collect();
            let items = self.attach_reasons(&profile, top).await;
            Feed {
                metadata: FeedMetadata {
                    total_count: items.len(),
                    generated_at: Utc::now(),
                },
                source: FeedSource::Personalized,
                items,
            }
        };

        self.cache
            .put(user_id, feed.clone(), self.config.cache_ttl)
            .await;
        Ok(feed)
    }

    /// Record an interaction and synchronously drop the user's cached feed.
    /// Invalidation runs even when the append fails, so a settling write can
    /// never leave a pre-interaction feed looking fresh.
    pub async fn track_interaction(&self, interaction: Interaction) -> Result<()> {
        if interaction.user_id.trim().is_empty() {
            return Err(Error::Validation("user_id is required".to_string()));
        }
        if interaction.article_id.trim().is_empty() {
            return Err(Error::Validation("article_id is required".to_string()));
        }

        let user_id = interaction.user_id.clone();
        let append_result = self.interactions.append(interaction).await;
        self.cache.invalidate(&user_id).await;
        info!("🧹 Invalidated cached feed for {}", user_id);
        append_result
    }

    async fn gather_candidates(&self, request: &FeedRequest) -> Result<Vec<Article>> {
        let mut candidates = if request.categories.is_empty() {
            self.articles
                .query_articles(&ArticleQuery {
                    category: None,
                    exclude_ids: Vec::new(),
                    limit: Some(self.config.candidate_pool),
                })
                .await?
        } else {
            let mut all = Vec::new();
            let mut ids = HashSet::new();
            for category in &request.categories {
                let batch = self
                    .articles
                    .query_articles(&ArticleQuery {
                        category: Some(category.clone()),
                        exclude_ids: Vec::new(),
                        limit: Some(self.config.candidate_pool),
                    })
                    .await?;
                for article in batch {
                    if ids.insert(article.id.clone()) {
                        all.push(article);
                    }
                }
            }
            all
        };

        if let Some(location) = &request.location {
            let needle = location.to_lowercase();
            candidates.retain(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
                    || a.keywords.iter().any(|k| k.to_lowercase() == needle)
            });
        }

        Ok(candidates)
    }

    async fn attach_reasons(
        &self,
        profile: &UserProfile,
        top: Vec<ScoredCandidate>,
    ) -> Vec<RecommendationItem> {
        let futures: Vec<_> = top
            .into_iter()
            .map(|scored| async move {
                let _permit = self.reason_semaphore.acquire().await.ok();
                let reason = self.reasons.explain(profile, &scored).await;
                RecommendationItem {
                    article_id: scored.article.id.clone(),
                    category: scored.article.category.clone(),
                    score: scored.score,
                    reason,
                    confidence: scored.score.clamp(0.0, 1.0),
                    source: FeedSource::Personalized,
                }
            })
            .collect();

        join_all(futures).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use nf_core::InteractionAction;
    use nf_llm::GatewayConfig;
    use nf_storage::MemoryStorage;
    use std::time::Duration;

    fn article(id: &str, category: &str, days_old: i64, credibility: f32) -> Article {
        Article {
            id: id.to_string(),
            url: format!("http://test.com/{}", id),
            title: format!("Article {}", id),
            content: "content".to_string(),
            category: category.to_string(),
            keywords: vec![category.to_string()],
            published_at: Utc::now() - ChronoDuration::days(days_old),
            source: "test".to_string(),
            credibility_score: credibility,
        }
    }

    fn interaction(user: &str, article: &str, action: InteractionAction) -> Interaction {
        Interaction {
            user_id: user.to_string(),
            article_id: article.to_string(),
            action,
            timestamp: Utc::now(),
            duration_seconds: Some(30.0),
            session_id: "s1".to_string(),
        }
    }

    async fn seeded_storage() -> Arc<MemoryStorage> {
        let storage = Arc::new(MemoryStorage::new());
        for i in 0..6 {
            storage
                .put_article(article(&format!("tech{}", i), "technology", i, 80.0))
                .await;
            storage
                .put_article(article(&format!("sport{}", i), "sports", i, 75.0))
                .await;
            storage
                .put_article(article(&format!("biz{}", i), "business", i, 70.0))
                .await;
            storage
                .put_article(article(&format!("sci{}", i), "science", i, 72.0))
                .await;
        }
        storage
    }

    fn offline_gateway() -> Arc<Gateway> {
        Arc::new(Gateway::new(Vec::new(), GatewayConfig::default()))
    }

    async fn personalizer_with(
        storage: Arc<MemoryStorage>,
        config: PersonalizeConfig,
    ) -> Personalizer {
        Personalizer::new(storage.clone(), storage, offline_gateway(), config)
    }

    #[tokio::test]
    async fn test_missing_user_id_is_rejected() {
        let personalizer =
            personalizer_with(seeded_storage().await, PersonalizeConfig::default()).await;
        let result = personalizer.get_feed("  ", &FeedRequest::default()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_cold_start_serves_fallback_buckets() {
        let personalizer =
            personalizer_with(seeded_storage().await, PersonalizeConfig::default()).await;

        let feed = personalizer
            .get_feed("newcomer", &FeedRequest::default())
            .await
            .unwrap();
        assert_eq!(feed.source, FeedSource::Fallback);
        assert!(feed.items.len() <= 20);

        let categories: HashSet<&str> =
            feed.items.iter().map(|i| i.category.as_str()).collect();
        assert!(categories.contains("business"));
        assert!(categories.contains("technology"));
        assert!(categories.contains("sports"));

        for item in &feed.items {
            assert!(item.score >= 0.0 && item.score <= 1.0);
            assert!(item.confidence >= 0.0 && item.confidence <= 1.0);
            assert!(!item.reason.is_empty());
            assert_eq!(item.source, FeedSource::Fallback);
        }
    }

    #[tokio::test]
    async fn test_feed_is_idempotent_within_ttl() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;
        for i in 0..3 {
            storage
                .append(interaction("reader", &format!("tech{}", i), InteractionAction::Save))
                .await
                .unwrap();
        }

        let first = personalizer
            .get_feed("reader", &FeedRequest::default())
            .await
            .unwrap();
        let second = personalizer
            .get_feed("reader", &FeedRequest::default())
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_track_interaction_invalidates_cache() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;

        let before = personalizer
            .get_feed("visitor", &FeedRequest::default())
            .await
            .unwrap();
        assert_eq!(before.source, FeedSource::Fallback);

        for i in 0..3 {
            personalizer
                .track_interaction(interaction(
                    "visitor",
                    &format!("tech{}", i),
                    InteractionAction::ReadComplete,
                ))
                .await
                .unwrap();
        }

        // the cached fallback feed must not survive the interactions
        let after = personalizer
            .get_feed("visitor", &FeedRequest::default())
            .await
            .unwrap();
        assert_eq!(after.source, FeedSource::Personalized);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_eleventh_call() {
        let storage = seeded_storage().await;
        let config = PersonalizeConfig {
            // zero TTL forces a recomputation per call so every request
            // reaches the limiter
            cache_ttl: Duration::ZERO,
            ..Default::default()
        };
        let personalizer = personalizer_with(storage, config).await;

        for _ in 0..10 {
            personalizer
                .get_feed("eager", &FeedRequest::default())
                .await
                .unwrap();
        }
        let result = personalizer.get_feed("eager", &FeedRequest::default()).await;
        match result {
            Err(Error::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs >= 1);
            }
            other => panic!("expected rate limit, got {:?}", other.map(|f| f.source)),
        }
    }

    #[tokio::test]
    async fn test_disjoint_histories_diverge() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;

        for i in 0..4 {
            storage
                .append(interaction("alice", &format!("tech{}", i), InteractionAction::ReadComplete))
                .await
                .unwrap();
            storage
                .append(interaction("bob", &format!("sport{}", i), InteractionAction::ReadComplete))
                .await
                .unwrap();
        }

        let request = FeedRequest {
            limit: 3,
            ..Default::default()
        };
        let alice = personalizer.get_feed("alice", &request).await.unwrap();
        let bob = personalizer.get_feed("bob", &request).await.unwrap();

        assert_eq!(alice.source, FeedSource::Personalized);
        assert_eq!(bob.source, FeedSource::Personalized);
        for item in alice.items.iter().chain(bob.items.iter()) {
            assert!(item.score >= 0.0 && item.score <= 1.0);
            assert!(!item.reason.is_empty());
            assert_eq!(item.source, FeedSource::Personalized);
        }

        let alice_top: Vec<&str> =
            alice.items.iter().map(|i| i.category.as_str()).collect();
        let bob_top: Vec<&str> = bob.items.iter().map(|i| i.category.as_str()).collect();
        assert_ne!(alice_top, bob_top);
        assert!(alice_top.contains(&"technology"));
        assert!(bob_top.contains(&"sports"));
    }

    #[tokio::test]
    async fn test_save_lifts_category_scores() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;
        for i in 0..3 {
            storage
                .append(interaction("carol", &format!("tech{}", i), InteractionAction::View))
                .await
                .unwrap();
        }

        let request = FeedRequest {
            limit: 30,
            ..Default::default()
        };
        let before = personalizer.get_feed("carol", &request).await.unwrap();
        let avg_before = average_category_score(&before, "science");

        personalizer
            .track_interaction(interaction("carol", "sci0", InteractionAction::Save))
            .await
            .unwrap();

        let after = personalizer.get_feed("carol", &request).await.unwrap();
        let avg_after = average_category_score(&after, "science");

        assert!(
            avg_after > avg_before,
            "expected science scores to rise: {} -> {}",
            avg_before,
            avg_after
        );
    }

    fn average_category_score(feed: &Feed, category: &str) -> f32 {
        let scores: Vec<f32> = feed
            .items
            .iter()
            .filter(|i| i.category == category)
            .map(|i| i.score)
            .collect();
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        }
    }

    #[tokio::test]
    async fn test_category_filter_restricts_candidates() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;
        for i in 0..3 {
            storage
                .append(interaction("dave", &format!("biz{}", i), InteractionAction::Save))
                .await
                .unwrap();
        }

        let request = FeedRequest {
            categories: vec!["sports".to_string()],
            ..Default::default()
        };
        let feed = personalizer.get_feed("dave", &request).await.unwrap();
        assert!(!feed.items.is_empty());
        assert!(feed.items.iter().all(|i| i.category == "sports"));
    }

    #[tokio::test]
    async fn test_seen_articles_stay_out_of_the_feed() {
        let storage = seeded_storage().await;
        let personalizer =
            personalizer_with(storage.clone(), PersonalizeConfig::default()).await;
        for i in 0..3 {
            storage
                .append(interaction("erin", &format!("tech{}", i), InteractionAction::ReadComplete))
                .await
                .unwrap();
        }

        let feed = personalizer
            .get_feed("erin", &FeedRequest { limit: 50, ..Default::default() })
            .await
            .unwrap();
        assert!(feed
            .items
            .iter()
            .all(|i| !["tech0", "tech1", "tech2"].contains(&i.article_id.as_str())));
    }
}
