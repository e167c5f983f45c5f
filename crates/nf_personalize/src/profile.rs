use chrono::{DateTime, Utc};
use nf_core::{ArticleStore, InteractionStore, Result, UserProfile};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::config::PersonalizeConfig;

const SECONDS_PER_DAY: f32 = 86_400.0;
const LN_2: f32 = std::f32::consts::LN_2;

/// Derives a lightweight user profile from the interaction log. The profile
/// is a view, recomputed per request; an empty history is a valid profile
/// with `total_interactions == 0`, not an error.
pub struct ProfileBuilder {
    articles: Arc<dyn ArticleStore>,
    interactions: Arc<dyn InteractionStore>,
    config: PersonalizeConfig,
}

impl ProfileBuilder {
    pub fn new(
        articles: Arc<dyn ArticleStore>,
        interactions: Arc<dyn InteractionStore>,
        config: PersonalizeConfig,
    ) -> Self {
        Self {
            articles,
            interactions,
            config,
        }
    }

    pub async fn build_profile(&self, user_id: &str) -> Result<UserProfile> {
        let since = Utc::now() - chrono::Duration::days(self.config.lookback_days);
        let interactions = self.interactions.query_since(user_id, since).await?;

        let mut profile = UserProfile::empty(user_id);
        profile.total_interactions = interactions.len();
        if interactions.is_empty() {
            return Ok(profile);
        }

        let now = Utc::now();
        for interaction in &interactions {
            let article = match self.articles.get_article(&interaction.article_id).await? {
                Some(article) => article,
                None => {
                    debug!(
                        "skipping interaction on unknown article {}",
                        interaction.article_id
                    );
                    continue;
                }
            };

            let decayed = interaction.action.weight()
                * decay(interaction.timestamp, now, self.config.decay_lambda);

            *profile
                .category_weights
                .entry(article.category.clone())
                .or_insert(0.0) += decayed;
            for keyword in &article.keywords {
                *profile
                    .keyword_weights
                    .entry(keyword.clone())
                    .or_insert(0.0) += decayed;
            }

            if interaction.action.is_positive() {
                *profile
                    .positive_keyword_weights
                    .entry(article.category.clone())
                    .or_insert(0.0) += decayed;
                for keyword in &article.keywords {
                    *profile
                        .positive_keyword_weights
                        .entry(keyword.clone())
                        .or_insert(0.0) += decayed;
                }
            }

            // behavior boost uses a shorter half-life than the profile decay
            let half_life_lambda = LN_2 / self.config.behavior_half_life_days;
            *profile
                .category_engagement
                .entry(article.category.clone())
                .or_insert(0.0) +=
                interaction.action.weight() * decay(interaction.timestamp, now, half_life_lambda);

            profile.recency_decayed_engagement += decayed;
            profile
                .seen_article_ids
                .insert(interaction.article_id.clone());
        }

        normalize(&mut profile.category_weights);
        normalize(&mut profile.keyword_weights);

        Ok(profile)
    }
}

fn decay(at: DateTime<Utc>, now: DateTime<Utc>, lambda_per_day: f32) -> f32 {
    let age_days = ((now - at).num_seconds() as f32 / SECONDS_PER_DAY).max(0.0);
    (-lambda_per_day * age_days).exp()
}

fn normalize(weights: &mut HashMap<String, f32>) {
    let total: f32 = weights.values().sum();
    if total > 0.0 {
        for value in weights.values_mut() {
            *value /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use nf_core::{Article, Interaction, InteractionAction};
    use nf_storage::MemoryStorage;

    fn article(id: &str, category: &str, keywords: &[&str]) -> Article {
        Article {
            id: id.to_string(),
            url: format!("http://test.com/{}", id),
            title: format!("Article {}", id),
            content: "content".to_string(),
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            published_at: Utc::now(),
            source: "test".to_string(),
            credibility_score: 75.0,
        }
    }

    fn interaction(
        user: &str,
        article: &str,
        action: InteractionAction,
        days_ago: i64,
    ) -> Interaction {
        Interaction {
            user_id: user.to_string(),
            article_id: article.to_string(),
            action,
            timestamp: Utc::now() - ChronoDuration::days(days_ago),
            duration_seconds: None,
            session_id: "s1".to_string(),
        }
    }

    async fn builder_with(
        articles: Vec<Article>,
        interactions: Vec<Interaction>,
    ) -> ProfileBuilder {
        let storage = Arc::new(MemoryStorage::new());
        for a in articles {
            storage.put_article(a).await;
        }
        for i in interactions {
            storage.append(i).await.unwrap();
        }
        ProfileBuilder::new(storage.clone(), storage, PersonalizeConfig::default())
    }

    #[tokio::test]
    async fn test_empty_history_is_valid_profile() {
        let builder = builder_with(vec![], vec![]).await;
        let profile = builder.build_profile("nobody").await.unwrap();
        assert_eq!(profile.total_interactions, 0);
        assert!(profile.category_weights.is_empty());
    }

    #[tokio::test]
    async fn test_category_weights_normalize() {
        let builder = builder_with(
            vec![
                article("a1", "technology", &["ai"]),
                article("a2", "sports", &["football"]),
            ],
            vec![
                interaction("u1", "a1", InteractionAction::Save, 1),
                interaction("u1", "a2", InteractionAction::View, 1),
            ],
        )
        .await;

        let profile = builder.build_profile("u1").await.unwrap();
        assert_eq!(profile.total_interactions, 2);

        let total: f32 = profile.category_weights.values().sum();
        assert!((total - 1.0).abs() < 1e-5);
        // save (3.0) outweighs view (1.0)
        assert!(
            profile.category_weights["technology"] > profile.category_weights["sports"]
        );
    }

    #[tokio::test]
    async fn test_recency_decay_orders_weights() {
        let builder = builder_with(
            vec![
                article("a1", "technology", &[]),
                article("a2", "sports", &[]),
            ],
            vec![
                interaction("u1", "a1", InteractionAction::View, 60),
                interaction("u1", "a2", InteractionAction::View, 1),
            ],
        )
        .await;

        let profile = builder.build_profile("u1").await.unwrap();
        // same action weight, but the older interaction decays harder
        assert!(profile.category_weights["sports"] > profile.category_weights["technology"]);
    }

    #[tokio::test]
    async fn test_positive_signals_exclude_views() {
        let builder = builder_with(
            vec![
                article("a1", "technology", &["ai"]),
                article("a2", "sports", &["football"]),
            ],
            vec![
                interaction("u1", "a1", InteractionAction::Share, 1),
                interaction("u1", "a2", InteractionAction::View, 1),
            ],
        )
        .await;

        let profile = builder.build_profile("u1").await.unwrap();
        assert!(profile.positive_keyword_weights.contains_key("ai"));
        assert!(!profile.positive_keyword_weights.contains_key("football"));
        assert_eq!(profile.seen_article_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_articles_are_skipped() {
        let builder = builder_with(
            vec![article("a1", "technology", &[])],
            vec![
                interaction("u1", "a1", InteractionAction::View, 1),
                interaction("u1", "ghost", InteractionAction::Save, 1),
            ],
        )
        .await;

        let profile = builder.build_profile("u1").await.unwrap();
        assert_eq!(profile.total_interactions, 2);
        assert_eq!(profile.category_weights.len(), 1);
    }
}
