use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use switchat_core::{LocationTier, NewsArticle};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::news::articles_for;
use crate::server::AppContext;
use crate::token::{JoinToken, MediaTokenIssuer};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct NewUserRecord {
    pub id: Uuid,
}

/// Either `{"user_id": ..}` or a database webhook payload `{"record": {"id": ..}}`.
#[derive(Debug, Deserialize)]
pub struct AutoLikeRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub record: Option<NewUserRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutoLikeResponse {
    pub liked: bool,
    pub post_id: Uuid,
    pub user_id: Uuid,
}

pub async fn auto_like(
    State(ctx): State<AppContext>,
    Json(request): Json<AutoLikeRequest>,
) -> Result<Json<AutoLikeResponse>, ApiError> {
    let post_id = ctx
        .seed_post_id
        .ok_or_else(|| ApiError::Config("SEED_POST_ID is not set".into()))?;
    let user_id = request
        .user_id
        .or(request.record.map(|r| r.id))
        .ok_or_else(|| ApiError::BadRequest("user_id is required".into()))?;

    ctx.backend.like_post(post_id, user_id).await?;
    info!(%post_id, %user_id, "seed post liked");
    Ok(Json(AutoLikeResponse {
        liked: true,
        post_id,
        user_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub tier: Option<String>,
}

pub async fn news(Query(query): Query<NewsQuery>) -> Json<Vec<NewsArticle>> {
    let tier = query
        .tier
        .as_deref()
        .map(LocationTier::parse)
        .unwrap_or_default();
    Json(articles_for(tier))
}

#[derive(Debug, Deserialize)]
pub struct MediaTokenRequest {
    pub room_id: String,
    #[serde(default)]
    pub speaker: bool,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn media_token(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(request): Json<MediaTokenRequest>,
) -> Result<Json<JoinToken>, ApiError> {
    let issuer = MediaTokenIssuer::from_credentials(&ctx.media)?;

    let room_id = request.room_id.trim();
    if room_id.is_empty() {
        return Err(ApiError::BadRequest("room_id is required".into()));
    }

    let access_token = bearer_token(&headers).ok_or(ApiError::Unauthorized)?;
    let user_id = ctx
        .backend
        .resolve_user(access_token)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !ctx
        .backend
        .can_join_room(room_id, user_id, request.speaker)
        .await?
    {
        let role = if request.speaker { "speaker" } else { "listener" };
        return Err(ApiError::Forbidden(format!("not allowed to join {room_id} as {role}")));
    }

    let token = issuer
        .issue(&user_id.to_string(), room_id, request.speaker)
        .map_err(|e| ApiError::Token(e.to_string()))?;
    info!(%user_id, room = room_id, speaker = request.speaker, "media token issued");
    Ok(Json(token))
}
