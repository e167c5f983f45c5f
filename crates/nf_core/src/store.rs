use crate::types::{Article, Interaction};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub category: Option<String>,
    pub exclude_ids: Vec<String>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Query articles matching the given filters, most recent first.
    async fn query_articles(&self, query: &ArticleQuery) -> Result<Vec<Article>>;

    /// Look up a single article by id.
    async fn get_article(&self, id: &str) -> Result<Option<Article>>;
}

#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Append an interaction to the log.
    async fn append(&self, interaction: Interaction) -> Result<()>;

    /// All interactions for a user at or after the given timestamp.
    async fn query_since(&self, user_id: &str, since: DateTime<Utc>)
        -> Result<Vec<Interaction>>;
}
