mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{post, profile, seed_posts};
use switchat_core::{
    FeedBackend, FeedError, FeedLoader, MemoryBackend, PostQuery, PostRow, Profile, Session,
    SharedBackend, ViewRecord,
};
use tokio::sync::oneshot;
use uuid::Uuid;

fn loader(backend: &MemoryBackend) -> FeedLoader {
    let shared: SharedBackend = Arc::new(backend.clone());
    FeedLoader::new(shared, 10)
}

/// Memory store whose post queries can be held back or made to fail.
struct ScriptedPosts {
    inner: MemoryBackend,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
    fail: AtomicBool,
}

impl ScriptedPosts {
    fn new(inner: MemoryBackend) -> Self {
        Self {
            inner,
            gate: Mutex::new(None),
            fail: AtomicBool::new(false),
        }
    }

    /// The next post query waits until the returned sender fires.
    fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some(rx);
        tx
    }

    fn is_holding(&self) -> bool {
        self.gate.lock().unwrap().is_some()
    }
}

#[async_trait]
impl FeedBackend for ScriptedPosts {
    async fn followed_ids(&self, session: &Session, viewer: Uuid) -> Result<Vec<Uuid>, FeedError> {
        self.inner.followed_ids(session, viewer).await
    }

    async fn fetch_posts(&self, session: &Session, query: &PostQuery) -> Result<Vec<PostRow>, FeedError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedError::Backend {
                status: 503,
                message: "unavailable".into(),
            });
        }
        self.inner.fetch_posts(session, query).await
    }

    async fn fetch_profiles(&self, session: &Session, ids: &[Uuid]) -> Result<Vec<Profile>, FeedError> {
        self.inner.fetch_profiles(session, ids).await
    }

    async fn insert_view(&self, session: &Session, record: &ViewRecord) -> Result<(), FeedError> {
        self.inner.insert_view(session, record).await
    }

    async fn update_latest_view(
        &self,
        session: &Session,
        video_id: Uuid,
        user_id: Uuid,
        watch_duration: u64,
        completed: bool,
    ) -> Result<bool, FeedError> {
        self.inner
            .update_latest_view(session, video_id, user_id, watch_duration, completed)
            .await
    }

    async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<(), FeedError> {
        self.inner.like_post(post_id, user_id).await
    }

    async fn resolve_user(&self, access_token: &str) -> Result<Option<Uuid>, FeedError> {
        self.inner.resolve_user(access_token).await
    }

    async fn can_join_room(&self, room_id: &str, user_id: Uuid, as_speaker: bool) -> Result<bool, FeedError> {
        self.inner.can_join_room(room_id, user_id, as_speaker).await
    }
}

#[tokio::test]
async fn load_more_pages_until_short_page() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    let friend = Uuid::new_v4();
    backend.follow(viewer, friend).await;
    seed_posts(&backend, friend, 24).await;

    let feed = loader(&backend);
    let session = Session::authenticated(viewer, "token");

    let mut lengths = Vec::new();
    let mut has_more = Vec::new();
    for _ in 0..3 {
        feed.load_more(&session).await.unwrap();
        lengths.push(feed.items().await.len());
        has_more.push(feed.has_more().await);
    }
    assert_eq!(lengths, vec![10, 20, 24]);
    assert_eq!(has_more, vec![true, true, false]);

    // Exhausted: further calls are no-ops.
    assert_eq!(feed.load_more(&session).await.unwrap(), 0);
    assert_eq!(feed.items().await.len(), 24);

    let items = feed.items().await;
    assert!(items.windows(2).all(|w| w[0].created_at > w[1].created_at));
    let mut ids: Vec<_> = items.iter().map(|i| i.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 24);
}

#[tokio::test]
async fn refresh_replaces_list_with_first_page() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    seed_posts(&backend, viewer, 15).await;

    let feed = loader(&backend);
    let session = Session::authenticated(viewer, "token");
    feed.load(&session, true).await.unwrap();
    feed.load_more(&session).await.unwrap();
    assert_eq!(feed.items().await.len(), 15);
    assert!(!feed.has_more().await);

    let first_page: Vec<_> = feed.items().await.into_iter().take(10).collect();
    feed.refresh(&session).await.unwrap();

    assert_eq!(feed.items().await, first_page);
    assert!(feed.has_more().await);
    assert_eq!(feed.cursor().await.before(), Some(first_page[9].created_at));
}

#[tokio::test]
async fn missing_profile_gets_placeholder() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    let ghost = Uuid::new_v4();
    backend.follow(viewer, ghost).await;
    backend.upsert_profile(profile(viewer, "me")).await;
    backend.add_post(post(viewer, 1)).await;
    backend.add_post(post(ghost, 2)).await;

    let feed = loader(&backend);
    feed.load(&Session::authenticated(viewer, "token"), true)
        .await
        .unwrap();

    let items = feed.items().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].profile.username.as_deref(), Some("me"));

    let orphan = &items[1];
    assert_eq!(orphan.user_id, ghost);
    assert_eq!(orphan.profile.username, None);
    assert_eq!(orphan.profile.display_name, None);
    assert!(!orphan.profile.is_verified);
}

#[tokio::test]
async fn only_followed_authors_and_media_posts_are_loaded() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    let friend = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    backend.follow(viewer, friend).await;
    backend.add_post(post(friend, 1)).await;
    backend.add_post(post(stranger, 2)).await;
    backend
        .add_post(PostRow {
            media_url: None,
            ..post(viewer, 3)
        })
        .await;
    backend.add_post(post(viewer, 4)).await;

    let feed = loader(&backend);
    let added = feed
        .load(&Session::authenticated(viewer, "token"), true)
        .await
        .unwrap();
    assert_eq!(added, 2);

    let authors: Vec<_> = feed.items().await.iter().map(|i| i.user_id).collect();
    assert_eq!(authors, vec![friend, viewer]);
    assert!(feed.items().await.iter().all(|i| i.has_media()));
}

#[tokio::test]
async fn empty_feed_and_anonymous_viewer_have_no_more() {
    let backend = MemoryBackend::in_memory();
    let feed = loader(&backend);

    feed.load_more(&Session::authenticated(Uuid::new_v4(), "t"))
        .await
        .unwrap();
    assert!(feed.items().await.is_empty());
    assert!(!feed.has_more().await);
    assert!(!feed.is_loading().await);

    let anonymous = loader(&backend);
    anonymous.refresh(&Session::anonymous()).await.unwrap();
    assert!(anonymous.items().await.is_empty());
    assert!(!anonymous.has_more().await);
}

#[tokio::test]
async fn page_from_before_refresh_is_discarded() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    seed_posts(&backend, viewer, 15).await;
    let scripted = Arc::new(ScriptedPosts::new(backend.clone()));
    let feed = FeedLoader::new(scripted.clone(), 10);
    let session = Session::authenticated(viewer, "token");

    feed.load(&session, true).await.unwrap();
    let first_page = feed.items().await;

    let release = scripted.hold_next();
    let stale = {
        let feed = feed.clone();
        let session = session.clone();
        tokio::spawn(async move { feed.load_more(&session).await })
    };
    while scripted.is_holding() {
        tokio::task::yield_now().await;
    }
    assert!(feed.is_loading().await);

    feed.refresh(&session).await.unwrap();
    release.send(()).unwrap();
    assert_eq!(stale.await.unwrap().unwrap(), 0);

    // The second page never lands on top of the refreshed list.
    assert_eq!(feed.items().await, first_page);
    assert!(feed.has_more().await);
    assert!(!feed.is_loading().await);
    assert_eq!(feed.cursor().await.before(), Some(first_page[9].created_at));
}

#[tokio::test]
async fn failed_page_keeps_list_and_clears_loading() {
    let backend = MemoryBackend::in_memory();
    let viewer = Uuid::new_v4();
    seed_posts(&backend, viewer, 15).await;
    let scripted = Arc::new(ScriptedPosts::new(backend.clone()));
    let feed = FeedLoader::new(scripted.clone(), 10);
    let session = Session::authenticated(viewer, "token");

    feed.load_more(&session).await.unwrap();
    let loaded = feed.items().await;
    let cursor = feed.cursor().await;

    scripted.fail.store(true, Ordering::SeqCst);
    let err = feed.load_more(&session).await.unwrap_err();
    assert!(matches!(err, FeedError::Backend { status: 503, .. }));

    assert_eq!(feed.items().await, loaded);
    assert_eq!(feed.cursor().await, cursor);
    assert!(feed.has_more().await);
    assert!(!feed.is_loading().await);

    // The same page can be asked for again once the backend recovers.
    scripted.fail.store(false, Ordering::SeqCst);
    assert_eq!(feed.load_more(&session).await.unwrap(), 5);
    assert_eq!(feed.items().await.len(), 15);
}
