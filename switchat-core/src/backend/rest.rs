use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::{FeedBackend, PostQuery};
use crate::config::BackendConfig;
use crate::error::FeedError;
use crate::models::{PostRow, Profile, ViewRecord};
use crate::session::Session;

const POST_COLUMNS: &str = "id,user_id,media_url,caption,kind,created_at";
const PROFILE_COLUMNS: &str = "id,username,display_name,avatar_url,is_verified,theme";

/// PostgREST-style HTTP client for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Deserialize)]
struct FollowRow {
    following_id: Uuid,
}

#[derive(Deserialize)]
struct IdRow {
    id: Uuid,
}

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, FeedError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| FeedError::Config(format!("backend url {:?}: {e}", config.url)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("switchat/0.1")
            .build()?;
        Ok(Self::with_client(client, base_url, config.anon_key.clone()))
    }

    pub fn with_client(client: Client, mut base_url: Url, api_key: impl Into<String>) -> Self {
        // Endpoints are joined onto the base; without the slash its last segment is lost.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, FeedError> {
        self.base_url
            .join(path)
            .map_err(|e| FeedError::Config(format!("bad endpoint {path}: {e}")))
    }

    /// Row-level security needs the viewer's token; fall back to the key otherwise.
    fn authorize(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let bearer = session
            .and_then(Session::access_token)
            .unwrap_or(self.api_key.as_str());
        request
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    fn table(&self, name: &str) -> Result<Url, FeedError> {
        self.endpoint(&format!("rest/v1/{name}"))
    }
}

fn in_list(ids: &[Uuid]) -> String {
    let joined = ids
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

async fn check(response: Response) -> Result<Response, FeedError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(FeedError::Backend {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl FeedBackend for RestBackend {
    async fn followed_ids(&self, session: &Session, viewer: Uuid) -> Result<Vec<Uuid>, FeedError> {
        let request = self
            .client
            .get(self.table("follows")?)
            .query(&[
                ("select", "following_id".to_string()),
                ("follower_id", format!("eq.{viewer}")),
            ]);
        let response = check(self.authorize(request, Some(session)).send().await?).await?;
        let rows: Vec<FollowRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| row.following_id).collect())
    }

    async fn fetch_posts(
        &self,
        session: &Session,
        query: &PostQuery,
    ) -> Result<Vec<PostRow>, FeedError> {
        if query.authors.is_empty() {
            return Ok(Vec::new());
        }
        let mut params = vec![
            ("select", POST_COLUMNS.to_string()),
            ("user_id", in_list(&query.authors)),
            ("media_url", "not.is.null".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(before) = query.before {
            params.push((
                "created_at",
                format!("lt.{}", before.to_rfc3339_opts(SecondsFormat::Micros, true)),
            ));
        }
        debug!(authors = query.authors.len(), before = ?query.before, "fetching posts");
        let request = self.client.get(self.table("posts")?).query(&params);
        let response = check(self.authorize(request, Some(session)).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn fetch_profiles(
        &self,
        session: &Session,
        ids: &[Uuid],
    ) -> Result<Vec<Profile>, FeedError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .client
            .get(self.table("profiles")?)
            .query(&[("select", PROFILE_COLUMNS.to_string()), ("id", in_list(ids))]);
        let response = check(self.authorize(request, Some(session)).send().await?).await?;
        Ok(response.json().await?)
    }

    async fn insert_view(&self, session: &Session, record: &ViewRecord) -> Result<(), FeedError> {
        let request = self
            .client
            .post(self.table("video_views")?)
            .header("Prefer", "return=minimal")
            .json(record);
        check(self.authorize(request, Some(session)).send().await?).await?;
        Ok(())
    }

    async fn update_latest_view(
        &self,
        session: &Session,
        video_id: Uuid,
        user_id: Uuid,
        watch_duration: u64,
        completed: bool,
    ) -> Result<bool, FeedError> {
        // PostgREST cannot order a PATCH, so look the latest row up first.
        let lookup = self
            .client
            .get(self.table("video_views")?)
            .query(&[
                ("select", "id".to_string()),
                ("video_id", format!("eq.{video_id}")),
                ("user_id", format!("eq.{user_id}")),
                ("order", "created_at.desc".to_string()),
                ("limit", "1".to_string()),
            ]);
        let response = check(self.authorize(lookup, Some(session)).send().await?).await?;
        let rows: Vec<IdRow> = response.json().await?;
        let Some(latest) = rows.first() else {
            return Ok(false);
        };

        let update = self
            .client
            .patch(self.table("video_views")?)
            .query(&[("id", format!("eq.{}", latest.id))])
            .header("Prefer", "return=minimal")
            .json(&json!({ "watch_duration": watch_duration, "completed": completed }));
        check(self.authorize(update, Some(session)).send().await?).await?;
        Ok(true)
    }

    async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        let request = self
            .client
            .post(self.table("likes")?)
            .query(&[("on_conflict", "post_id,user_id")])
            .header("Prefer", "resolution=ignore-duplicates,return=minimal")
            .json(&json!({ "post_id": post_id, "user_id": user_id }));
        check(self.authorize(request, None).send().await?).await?;
        Ok(())
    }

    async fn resolve_user(&self, access_token: &str) -> Result<Option<Uuid>, FeedError> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Ok(None);
        }
        let user: AuthUser = check(response).await?.json().await?;
        Ok(Some(user.id))
    }

    async fn can_join_room(
        &self,
        room_id: &str,
        user_id: Uuid,
        as_speaker: bool,
    ) -> Result<bool, FeedError> {
        let request = self
            .client
            .post(self.endpoint("rest/v1/rpc/can_join_room")?)
            .json(&json!({ "room_id": room_id, "user_id": user_id, "as_speaker": as_speaker }));
        let response = check(self.authorize(request, None).send().await?).await?;
        Ok(response.json().await?)
    }
}
