use axum::{routing::post, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/personalize", post(handlers::personalize))
        .route("/api/interactions/track", post(handlers::track_interaction))
        .route("/api/ml/generate", post(handlers::generate))
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use crate::AppState;
    pub use nf_core::{Feed, Result};
}
