use nf_core::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Sliding-window request counter keyed by user id. No cross-user
/// coordination; each key drains independently.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for the key, failing with a retry-after hint once the
    /// window is full.
    pub async fn check(&self, key: &str) -> Result<()> {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let window_hits = hits.entry(key.to_string()).or_default();

        while window_hits
            .front()
            .map_or(false, |t| now.duration_since(*t) >= self.window)
        {
            window_hits.pop_front();
        }

        if window_hits.len() >= self.max_requests {
            let retry_after = window_hits
                .front()
                .map(|t| self.window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(self.window);
            return Err(Error::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        window_hits.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_within_budget_pass() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("u1").await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_overflow_is_rejected_with_retry_hint() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        limiter.check("u1").await.unwrap();
        limiter.check("u1").await.unwrap();

        match limiter.check("u1").await {
            Err(Error::RateLimited { retry_after_secs }) => {
                assert!(retry_after_secs >= 1 && retry_after_secs <= 60);
            }
            other => panic!("expected rate limit error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        limiter.check("u1").await.unwrap();
        assert!(limiter.check("u2").await.is_ok());
        assert!(limiter.check("u1").await.is_err());
    }

    #[tokio::test]
    async fn test_window_drains() {
        let limiter = RateLimiter::new(1, Duration::from_millis(30));
        limiter.check("u1").await.unwrap();
        assert!(limiter.check("u1").await.is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(limiter.check("u1").await.is_ok());
    }
}
