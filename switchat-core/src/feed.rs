use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{PostQuery, SharedBackend};
use crate::error::FeedError;
use crate::models::{Cursor, FeedItem, Profile};
use crate::session::Session;

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone)]
pub struct FeedState {
    pub items: Vec<FeedItem>,
    pub cursor: Cursor,
    pub has_more: bool,
    pub loading: bool,
    // Bumped by refresh so pages requested before it are dropped.
    epoch: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: Cursor::start(),
            has_more: true,
            loading: false,
            epoch: 0,
        }
    }
}

pub type SharedFeedState = Arc<RwLock<FeedState>>;

/// Cursor-paginated feed of media posts from the viewer and the people they
/// follow.
#[derive(Clone)]
pub struct FeedLoader {
    backend: SharedBackend,
    page_size: usize,
    state: SharedFeedState,
}

impl FeedLoader {
    pub fn new(backend: SharedBackend, page_size: usize) -> Self {
        Self {
            backend,
            page_size: page_size.max(1),
            state: Arc::new(RwLock::new(FeedState::default())),
        }
    }

    pub fn shared_state(&self) -> SharedFeedState {
        Arc::clone(&self.state)
    }

    pub async fn items(&self) -> Vec<FeedItem> {
        self.state.read().await.items.clone()
    }

    pub async fn has_more(&self) -> bool {
        self.state.read().await.has_more
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn cursor(&self) -> Cursor {
        self.state.read().await.cursor
    }

    /// Loads one page. `initial` replaces the list from the start of the feed;
    /// otherwise the page after the cursor is appended. Returns the number of
    /// items the page contributed.
    pub async fn load(&self, session: &Session, initial: bool) -> Result<usize, FeedError> {
        let (before, epoch) = {
            let mut state = self.state.write().await;
            state.loading = true;
            let before = if initial { None } else { state.cursor.before() };
            (before, state.epoch)
        };

        let page = self.fetch_page(session, before).await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("discarding page requested before a refresh");
            return Ok(0);
        }
        state.loading = false;
        let items = match page {
            Ok(items) => items,
            Err(err) => {
                warn!(error = %err, "failed to load feed page");
                return Err(err);
            }
        };

        let count = items.len();
        state.has_more = count == self.page_size;
        if let Some(oldest) = items.last() {
            state.cursor = Cursor::at(oldest.created_at);
        } else if initial {
            state.cursor = Cursor::start();
        }
        if initial {
            state.items = items;
        } else {
            state.items.extend(items);
        }
        info!(count, total = state.items.len(), has_more = state.has_more, "feed page loaded");
        Ok(count)
    }

    /// Next page, or the first one when nothing was fetched yet. No-op while a
    /// page is loading or once the feed is exhausted.
    pub async fn load_more(&self, session: &Session) -> Result<usize, FeedError> {
        let initial = {
            let state = self.state.read().await;
            if state.loading || !state.has_more {
                return Ok(0);
            }
            state.cursor.is_start() && state.items.is_empty()
        };
        self.load(session, initial).await
    }

    pub async fn refresh(&self, session: &Session) -> Result<usize, FeedError> {
        {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.cursor = Cursor::start();
            state.has_more = true;
        }
        self.load(session, true).await
    }

    async fn fetch_page(
        &self,
        session: &Session,
        before: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<FeedItem>, FeedError> {
        let Some(viewer) = session.viewer_id() else {
            debug!("no viewer, feed is empty");
            return Ok(Vec::new());
        };

        let mut authors = self.backend.followed_ids(session, viewer).await?;
        if !authors.contains(&viewer) {
            authors.push(viewer);
        }

        let query = PostQuery {
            authors,
            before,
            limit: self.page_size,
        };
        let rows = self.backend.fetch_posts(session, &query).await?;
        let rows: Vec<_> = rows.into_iter().filter(|row| row.media_url.is_some()).collect();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let author_ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        // A failed profile fetch degrades to placeholders rather than dropping the page.
        let profiles: HashMap<Uuid, Profile> = match self
            .backend
            .fetch_profiles(session, &author_ids)
            .await
        {
            Ok(profiles) => profiles.into_iter().map(|p| (p.id, p)).collect(),
            Err(err) => {
                warn!(error = %err, "failed to load author profiles");
                HashMap::new()
            }
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let profile = profiles
                    .get(&row.user_id)
                    .cloned()
                    .unwrap_or_else(|| Profile::unknown(row.user_id));
                FeedItem::from_row(row, profile)
            })
            .collect())
    }
}
