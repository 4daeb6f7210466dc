//! Access to the hosted backend.
//!
//! Everything the feed, the analytics and the edge handlers need from the
//! backend goes through [`FeedBackend`]. [`RestBackend`] talks HTTP to the
//! hosted service; [`MemoryBackend`] keeps the same data in process and is what
//! tests and local runs use.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::FeedError;
use crate::models::{PostRow, Profile, ViewRecord};
use crate::session::Session;

pub mod memory;
pub mod rest;

pub use memory::{MemoryBackend, RoomAccess};
pub use rest::RestBackend;

/// One page request against the posts collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub authors: Vec<Uuid>,
    /// Only items strictly older than this.
    pub before: Option<DateTime<Utc>>,
    pub limit: usize,
}

#[async_trait]
pub trait FeedBackend: Send + Sync {
    /// Ids of the users `viewer` follows.
    async fn followed_ids(&self, session: &Session, viewer: Uuid) -> Result<Vec<Uuid>, FeedError>;

    /// Posts by `query.authors` carrying media, newest first.
    async fn fetch_posts(&self, session: &Session, query: &PostQuery)
        -> Result<Vec<PostRow>, FeedError>;

    /// Profiles for the given ids. Missing ids are simply absent from the result.
    async fn fetch_profiles(&self, session: &Session, ids: &[Uuid]) -> Result<Vec<Profile>, FeedError>;

    async fn insert_view(&self, session: &Session, record: &ViewRecord) -> Result<(), FeedError>;

    /// Updates the most recently created view for (video, user). Returns false
    /// when there was no record to update.
    async fn update_latest_view(
        &self,
        session: &Session,
        video_id: Uuid,
        user_id: Uuid,
        watch_duration: u64,
        completed: bool,
    ) -> Result<bool, FeedError>;

    /// Likes a post on behalf of `user_id`. Liking twice is not an error.
    async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), FeedError>;

    /// Maps an access token to the user it was issued for.
    async fn resolve_user(&self, access_token: &str) -> Result<Option<Uuid>, FeedError>;

    /// Room authorization: may `user_id` join `room_id`, as a speaker or as a listener.
    async fn can_join_room(
        &self,
        room_id: &str,
        user_id: Uuid,
        as_speaker: bool,
    ) -> Result<bool, FeedError>;
}

pub type SharedBackend = Arc<dyn FeedBackend>;
