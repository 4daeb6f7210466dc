//! Best-effort view analytics for one mounted feed item.

use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::SharedBackend;
use crate::models::ViewRecord;
use crate::session::Session;

/// Per-mount guard state. Created with the player, discarded with it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewSession {
    begun: bool,
    started_at: Option<Instant>,
}

impl ViewSession {
    pub fn has_begun(&self) -> bool {
        self.begun
    }

    /// A provisional record exists and has not been finalized yet.
    pub fn is_open(&self) -> bool {
        self.started_at.is_some()
    }
}

pub struct ViewTracker {
    backend: SharedBackend,
    view: ViewSession,
}

impl ViewTracker {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            view: ViewSession::default(),
        }
    }

    pub fn view_session(&self) -> ViewSession {
        self.view
    }

    /// Inserts the provisional record for this mount. Returns true when a record
    /// was written.
    pub async fn begin_view(&mut self, item_id: Uuid, session: &Session) -> bool {
        if self.view.begun {
            debug!(%item_id, "view already tracked for this mount");
            return false;
        }
        let Some(viewer) = session.viewer_id() else {
            return false;
        };
        // Set before the insert so a second call during the await is a no-op.
        self.view.begun = true;

        let started_at = Instant::now();
        let record = ViewRecord::provisional(item_id, viewer);
        match self.backend.insert_view(session, &record).await {
            Ok(()) => {
                self.view.started_at = Some(started_at);
                true
            }
            Err(err) => {
                warn!(%item_id, error = %err, "failed to record view");
                false
            }
        }
    }

    /// Writes the watch duration and completion flag onto the latest record for
    /// this item and viewer. Returns true when the update went through.
    pub async fn finalize_view(&mut self, item_id: Uuid, session: &Session, completed: bool) -> bool {
        let Some(started_at) = self.view.started_at.take() else {
            return false;
        };
        let Some(viewer) = session.viewer_id() else {
            return false;
        };
        let watch_duration = started_at.elapsed().as_secs();

        match self
            .backend
            .update_latest_view(session, item_id, viewer, watch_duration, completed)
            .await
        {
            Ok(true) => {
                debug!(%item_id, watch_duration, completed, "view finalized");
                true
            }
            Ok(false) => {
                warn!(%item_id, "no view record to finalize");
                false
            }
            Err(err) => {
                warn!(%item_id, error = %err, "failed to finalize view");
                false
            }
        }
    }
}
