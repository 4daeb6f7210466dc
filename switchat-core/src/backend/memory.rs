use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{FeedBackend, PostQuery};
use crate::error::FeedError;
use crate::models::{PostRow, Profile, ViewRecord};
use crate::session::Session;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomAccess {
    /// Anyone may listen.
    pub open: bool,
    pub speakers: HashSet<Uuid>,
    pub listeners: HashSet<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct MemoryData {
    // follower -> followed
    follows: HashMap<Uuid, HashSet<Uuid>>,
    posts: Vec<PostRow>,
    profiles: HashMap<Uuid, Profile>,
    views: Vec<ViewRecord>,
    likes: HashSet<(Uuid, Uuid)>,
    rooms: HashMap<String, RoomAccess>,
    // access token -> user
    tokens: HashMap<String, Uuid>,
}

/// In-process backend with optional JSON snapshot persistence.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    inner: Arc<RwLock<MemoryData>>,
    path: Option<PathBuf>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl MemoryBackend {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryData::default())),
            path: None,
        }
    }

    /// Loads a snapshot, falling back to the `.json.tmp` sibling when the main
    /// file is unreadable as JSON.
    pub async fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let data = read_snapshot(&path).await;
        Self {
            inner: Arc::new(RwLock::new(data)),
            path: Some(path),
        }
    }

    async fn persist(&self) {
        let Some(path) = &self.path else {
            debug!("memory backend has no snapshot path; skipping persist");
            return;
        };
        let bytes = {
            let inner = self.inner.read().await;
            match serde_json::to_vec_pretty(&*inner) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(error = %e, "failed to serialize memory backend");
                    return;
                }
            }
        };
        if let Some(parent) = path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        // Write beside the snapshot, then swap it in.
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            warn!(error = %e, path = %tmp.display(), "failed to write snapshot");
            return;
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            warn!(error = %e, path = %path.display(), "failed to persist snapshot");
        }
    }

    pub async fn follow(&self, follower: Uuid, followed: Uuid) {
        self.inner
            .write()
            .await
            .follows
            .entry(follower)
            .or_default()
            .insert(followed);
        self.persist().await;
    }

    pub async fn add_post(&self, post: PostRow) {
        self.inner.write().await.posts.push(post);
        self.persist().await;
    }

    pub async fn upsert_profile(&self, profile: Profile) {
        self.inner.write().await.profiles.insert(profile.id, profile);
        self.persist().await;
    }

    pub async fn set_room(&self, room_id: impl Into<String>, access: RoomAccess) {
        self.inner.write().await.rooms.insert(room_id.into(), access);
        self.persist().await;
    }

    pub async fn register_token(&self, access_token: impl Into<String>, user_id: Uuid) {
        self.inner
            .write()
            .await
            .tokens
            .insert(access_token.into(), user_id);
        self.persist().await;
    }

    pub async fn views(&self) -> Vec<ViewRecord> {
        self.inner.read().await.views.clone()
    }

    pub async fn has_liked(&self, post_id: Uuid, user_id: Uuid) -> bool {
        self.inner.read().await.likes.contains(&(post_id, user_id))
    }

    pub async fn like_count(&self, post_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .likes
            .iter()
            .filter(|(post, _)| *post == post_id)
            .count()
    }
}

/// Reads the snapshot at `path`. A missing file is an empty store; a corrupt
/// one is replaced by the copy left in `.json.tmp` by an interrupted write.
async fn read_snapshot(path: &Path) -> MemoryData {
    let Ok(bytes) = tokio::fs::read(path).await else {
        return MemoryData::default();
    };
    match serde_json::from_slice(&bytes) {
        Ok(data) => data,
        Err(e) => {
            let tmp = path.with_extension("json.tmp");
            warn!(error = %e, path = %path.display(), fallback = %tmp.display(), "snapshot is corrupt");
            tokio::fs::read(&tmp)
                .await
                .ok()
                .and_then(|bytes| serde_json::from_slice(&bytes).ok())
                .unwrap_or_default()
        }
    }
}

#[async_trait]
impl FeedBackend for MemoryBackend {
    async fn followed_ids(&self, _session: &Session, viewer: Uuid) -> Result<Vec<Uuid>, FeedError> {
        let inner = self.inner.read().await;
        Ok(inner
            .follows
            .get(&viewer)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn fetch_posts(
        &self,
        _session: &Session,
        query: &PostQuery,
    ) -> Result<Vec<PostRow>, FeedError> {
        let inner = self.inner.read().await;
        let mut posts: Vec<PostRow> = inner
            .posts
            .iter()
            .filter(|p| query.authors.contains(&p.user_id))
            .filter(|p| p.media_url.is_some())
            .filter(|p| query.before.map_or(true, |before| p.created_at < before))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(query.limit);
        Ok(posts)
    }

    async fn fetch_profiles(
        &self,
        _session: &Session,
        ids: &[Uuid],
    ) -> Result<Vec<Profile>, FeedError> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.profiles.get(id).cloned())
            .collect())
    }

    async fn insert_view(&self, _session: &Session, record: &ViewRecord) -> Result<(), FeedError> {
        let mut record = record.clone();
        record.id.get_or_insert_with(Uuid::new_v4);
        self.inner.write().await.views.push(record);
        self.persist().await;
        Ok(())
    }

    async fn update_latest_view(
        &self,
        _session: &Session,
        video_id: Uuid,
        user_id: Uuid,
        watch_duration: u64,
        completed: bool,
    ) -> Result<bool, FeedError> {
        let updated = {
            let mut inner = self.inner.write().await;
            // Insertion order doubles as creation order.
            match inner
                .views
                .iter_mut()
                .rev()
                .find(|v| v.video_id == video_id && v.user_id == user_id)
            {
                Some(view) => {
                    view.watch_duration = watch_duration;
                    view.completed = completed;
                    true
                }
                None => false,
            }
        };
        if updated {
            self.persist().await;
        }
        Ok(updated)
    }

    async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        let inserted = self.inner.write().await.likes.insert((post_id, user_id));
        if inserted {
            self.persist().await;
        } else {
            debug!(%post_id, %user_id, "post already liked");
        }
        Ok(())
    }

    async fn resolve_user(&self, access_token: &str) -> Result<Option<Uuid>, FeedError> {
        Ok(self.inner.read().await.tokens.get(access_token).copied())
    }

    async fn can_join_room(
        &self,
        room_id: &str,
        user_id: Uuid,
        as_speaker: bool,
    ) -> Result<bool, FeedError> {
        let inner = self.inner.read().await;
        let Some(room) = inner.rooms.get(room_id) else {
            return Ok(false);
        };
        let allowed = if as_speaker {
            room.speakers.contains(&user_id)
        } else {
            room.open || room.listeners.contains(&user_id) || room.speakers.contains(&user_id)
        };
        Ok(allowed)
    }
}
