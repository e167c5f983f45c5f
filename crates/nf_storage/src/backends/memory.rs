use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nf_core::{Article, ArticleQuery, ArticleStore, Interaction, InteractionStore, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    articles: Vec<Article>,
    interactions: Vec<Interaction>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert_article(&mut self, article: Article) {
        if let Some(existing) = self.articles.iter_mut().find(|a| a.id == article.id) {
            *existing = article;
        } else {
            self.articles.push(article);
        }
    }

    fn query_articles(&self, query: &ArticleQuery) -> Vec<Article> {
        let mut matches: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |c| a.category.eq_ignore_ascii_case(c))
            })
            .filter(|a| !query.exclude_ids.iter().any(|id| id == &a.id))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        matches
    }
}

pub struct MemoryStorage {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new())),
        }
    }

    /// Insert or replace an article. Articles arrive through ingestion
    /// boundaries or test fixtures, never from the personalization core.
    pub async fn put_article(&self, article: Article) {
        let mut store = self.store.write().await;
        store.upsert_article(article);
    }

    pub async fn article_count(&self) -> usize {
        self.store.read().await.articles.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ArticleStore for MemoryStorage {
    async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>> {
        let store = self.store.read().await;
        Ok(store.query_articles(query))
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        let store = self.store.read().await;
        Ok(store.articles.iter().find(|a| a.id == id).cloned())
    }
}

#[async_trait]
impl InteractionStore for MemoryStorage {
    async fn append(&self, interaction: Interaction) -> Result<()> {
        let mut store = self.store.write().await;
        store.interactions.push(interaction);
        Ok(())
    }

    async fn query_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Interaction>> {
        let store = self.store.read().await;
        Ok(store
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id && i.timestamp >= since)
            .cloned()
            .collect())
    }
}
