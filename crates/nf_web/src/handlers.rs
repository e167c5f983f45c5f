use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use nf_core::{Error, Feed, Interaction, InteractionAction};
use nf_llm::{GenerateOptions, LlmResponse, SourceDoc};
use nf_personalize::FeedRequest;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            Error::Validation(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            Error::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "rate limit exceeded", "retryAfter": retry_after_secs }),
            ),
            Error::NotFound(what) => (StatusCode::NOT_FOUND, json!({ "error": what })),
            Error::Provider { message, .. } => {
                (StatusCode::BAD_GATEWAY, json!({ "error": message }))
            }
            other => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": other.to_string() }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PersonalizeRequest {
    #[serde(default)]
    pub user_id: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub location_filter: Option<String>,
    pub diversity_boost: Option<f32>,
    pub exclude_seen: Option<bool>,
}

pub async fn personalize(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PersonalizeRequest>,
) -> Result<Json<Feed>, ApiError> {
    let feed_request = FeedRequest {
        limit: request.limit.unwrap_or(20),
        categories: request.categories,
        location: request.location_filter,
        diversity_boost: request.diversity_boost,
        exclude_seen: request.exclude_seen.unwrap_or(true),
    };
    let feed = state
        .personalizer
        .get_feed(&request.user_id, &feed_request)
        .await?;
    Ok(Json(feed))
}

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub article_id: String,
    pub action: InteractionAction,
    pub duration_seconds: Option<f32>,
    pub session_id: Option<String>,
}

pub async fn track_interaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrackRequest>,
) -> Result<Json<Value>, ApiError> {
    let interaction = Interaction {
        user_id: request.user_id,
        article_id: request.article_id,
        action: request.action,
        timestamp: Utc::now(),
        duration_seconds: request.duration_seconds,
        session_id: request
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
    };
    state.personalizer.track_interaction(interaction).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub sources: Vec<SourceDoc>,
    #[serde(default)]
    pub options: GenerateOptions,
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<LlmResponse>, ApiError> {
    let response = state
        .gateway
        .generate(&request.prompt, &request.options, &request.sources)
        .await?;
    Ok(Json(response))
}
