use std::time::Duration;

/// Tunable constants for the personalization pipeline. Defaults match the
/// documented behavior; every field is surfaced as a CLI flag by the binary.
#[derive(Debug, Clone)]
pub struct PersonalizeConfig {
    /// Interaction lookback window for profile building, in days.
    pub lookback_days: i64,
    /// Per-day exponential decay rate applied to interaction recency.
    pub decay_lambda: f32,
    /// Below this many interactions the fallback feed is served.
    pub min_interactions: usize,
    /// Half-life in days for the per-category behavior boost.
    pub behavior_half_life_days: f32,
    /// Scale in days for the freshness component, exp(-age/scale).
    pub freshness_scale_days: f32,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub rate_limit_per_minute: usize,
    pub rate_limit_window: Duration,
    /// Items at or below this confidence get a templated reason without a
    /// provider call.
    pub reason_confidence_threshold: f32,
    pub reason_max_tokens: u32,
    pub max_concurrent_reasons: usize,
    /// Upper bound on candidates pulled from the article store per request.
    pub candidate_pool: usize,
}

impl Default for PersonalizeConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            decay_lambda: 0.1,
            min_interactions: 3,
            behavior_half_life_days: 7.0,
            freshness_scale_days: 30.0,
            cache_ttl: Duration::from_secs(900),
            cache_capacity: 1024,
            rate_limit_per_minute: 10,
            rate_limit_window: Duration::from_secs(60),
            reason_confidence_threshold: 0.3,
            reason_max_tokens: 50,
            max_concurrent_reasons: 4,
            candidate_pool: 200,
        }
    }
}
