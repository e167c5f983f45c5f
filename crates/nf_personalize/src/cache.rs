use chrono::{DateTime, Utc};
use nf_core::Feed;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// One memoized feed per user. Any tracked interaction for the user removes
/// the whole entry; there is no partial invalidation.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub feed: Feed,
    pub computed_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        match (now - self.computed_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}

pub struct FeedCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    capacity: usize,
}

impl FeedCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<Feed> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        match entries.get(user_id) {
            Some(entry) if entry.is_live(now) => Some(entry.feed.clone()),
            Some(_) => {
                entries.remove(user_id);
                None
            }
            None => None,
        }
    }

    pub async fn put(&self, user_id: &str, feed: Feed, ttl: Duration) {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        if entries.len() >= self.capacity && !entries.contains_key(user_id) {
            entries.retain(|_, entry| entry.is_live(now));
            if entries.len() >= self.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.computed_at)
                    .map(|(key, _)| key.clone());
                if let Some(key) = oldest {
                    entries.remove(&key);
                }
            }
        }
        entries.insert(
            user_id.to_string(),
            CacheEntry {
                feed,
                computed_at: now,
                ttl,
            },
        );
    }

    pub async fn invalidate(&self, user_id: &str) {
        self.entries.lock().await.remove(user_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
