pub mod cache;
pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod profile;
pub mod ratelimit;
pub mod reasons;
pub mod scoring;

pub use config::PersonalizeConfig;
pub use orchestrator::{FeedRequest, Personalizer};

pub mod prelude {
    pub use super::config::PersonalizeConfig;
    pub use super::orchestrator::{FeedRequest, Personalizer};
    pub use nf_core::{Feed, FeedSource, RecommendationItem, Result, UserProfile};
}
