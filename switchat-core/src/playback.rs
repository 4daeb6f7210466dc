//! Autoplay coordination for one feed item.
//!
//! A [`PlaybackController`] owns the media element of a single rendered item.
//! It plays only while the item is both the active one and sufficiently
//! visible, records a view once playback has lasted the dwell time, and
//! finalizes that view when playback stops or the media ends.
//!
//! `play()` on a media element may be rejected by the platform and may settle
//! late. Every play attempt carries a generation number; an attempt that
//! settles after a newer play/pause decision is discarded, so a stale promise
//! can never flip the state back to playing after a pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::SharedBackend;
use crate::config::PlaybackConfig;
use crate::error::MediaError;
use crate::session::Session;
use crate::views::{ViewSession, ViewTracker};
use crate::visibility::IntersectionState;

/// The platform media element behind a feed item.
#[async_trait]
pub trait MediaElement: Send + Sync + 'static {
    fn seek_to_start(&self);
    /// Starts playback. May be rejected, and may resolve after a later `pause()`.
    async fn play(&self) -> Result<(), MediaError>;
    fn pause(&self);
    fn set_muted(&self, muted: bool);
    /// Forces the source to be fetched again.
    fn reload(&self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Waiting,
    CanPlay,
    Playing,
    TimeUpdate { current_secs: f64, duration_secs: f64 },
    Ended,
    Error(MediaError),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub is_muted: bool,
    pub progress_percent: f64,
    pub is_buffering: bool,
    pub has_error: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            is_muted: true,
            progress_percent: 0.0,
            is_buffering: false,
            has_error: false,
        }
    }
}

/// Pending `begin_view` after the dwell time.
///
/// `armed` stays set while the task has not committed to writing the record.
/// Whoever clears it first wins: the task goes on to insert, or the canceller
/// aborts it. An insert already under way is never dropped half-way.
#[derive(Debug)]
struct DwellTimer {
    armed: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl DwellTimer {
    fn cancel(self) {
        if self.armed.swap(false, Ordering::AcqRel) {
            self.handle.abort();
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: PlaybackState,
    is_active: bool,
    is_intersecting: bool,
    wants_play: bool,
    generation: u64,
    dwell: Option<DwellTimer>,
    follower: Option<AbortHandle>,
}

impl Inner {
    fn should_autoplay(&self) -> bool {
        self.is_active && self.is_intersecting
    }

    /// Records a pause decision and hands back the pending dwell timer.
    fn decide_pause(&mut self) -> Option<DwellTimer> {
        self.generation += 1;
        self.wants_play = false;
        self.state.is_playing = false;
        self.dwell.take()
    }
}

pub struct PlaybackController<M: MediaElement> {
    item_id: Uuid,
    session: Session,
    dwell: Duration,
    media: Arc<M>,
    inner: Arc<Mutex<Inner>>,
    tracker: Arc<tokio::sync::Mutex<ViewTracker>>,
}

impl<M: MediaElement> Clone for PlaybackController<M> {
    fn clone(&self) -> Self {
        Self {
            item_id: self.item_id,
            session: self.session.clone(),
            dwell: self.dwell,
            media: Arc::clone(&self.media),
            inner: Arc::clone(&self.inner),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<M: MediaElement> PlaybackController<M> {
    /// Starts a viewing session for `item_id`. The media element starts muted.
    pub fn mount(
        item_id: Uuid,
        media: M,
        backend: SharedBackend,
        session: Session,
        config: &PlaybackConfig,
    ) -> Self {
        media.set_muted(true);
        Self {
            item_id,
            session,
            dwell: config.dwell(),
            media: Arc::new(media),
            inner: Arc::new(Mutex::new(Inner::default())),
            tracker: Arc::new(tokio::sync::Mutex::new(ViewTracker::new(backend))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn item_id(&self) -> Uuid {
        self.item_id
    }

    pub fn media(&self) -> &M {
        &self.media
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub async fn view_session(&self) -> ViewSession {
        self.tracker.lock().await.view_session()
    }

    pub async fn set_active(&self, is_active: bool) {
        self.lock().is_active = is_active;
        self.reconcile().await;
    }

    pub async fn set_intersecting(&self, is_intersecting: bool) {
        self.lock().is_intersecting = is_intersecting;
        self.reconcile().await;
    }

    /// Feeds visibility reports from a detector until the detector goes away
    /// or the controller is unmounted. Following a new detector replaces the
    /// previous one.
    pub fn follow_visibility(&self, mut rx: watch::Receiver<IntersectionState>) -> JoinHandle<()> {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                let visible = rx.borrow_and_update().is_intersecting;
                controller.set_intersecting(visible).await;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
        if let Some(previous) = self.lock().follower.replace(handle.abort_handle()) {
            previous.abort();
        }
        handle
    }

    async fn reconcile(&self) {
        let (should_play, wants_play) = {
            let inner = self.lock();
            (inner.should_autoplay(), inner.wants_play)
        };
        match (should_play, wants_play) {
            (true, false) => self.start(true, true).await,
            (false, true) => self.stop().await,
            _ => {}
        }
    }

    /// Attempts playback and applies the outcome unless a newer decision
    /// superseded it while `play()` was pending.
    async fn start(&self, from_start: bool, track_view: bool) {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.wants_play = true;
            inner.generation
        };
        if from_start {
            self.media.seek_to_start();
        }

        let result = self.media.play().await;

        let mut inner = self.lock();
        if inner.generation != generation || !inner.wants_play {
            debug!(item = %self.item_id, "play settled after a newer decision, ignoring");
            if result.is_ok() && !inner.wants_play {
                self.media.pause();
            }
            return;
        }
        match result {
            Ok(()) => {
                inner.state.is_playing = true;
                inner.state.has_error = false;
                if track_view {
                    if let Some(previous) = inner.dwell.replace(self.spawn_dwell_timer()) {
                        previous.cancel();
                    }
                }
            }
            Err(err) => {
                warn!(item = %self.item_id, error = %err, "playback failed to start");
                inner.wants_play = false;
                inner.state.is_playing = false;
                inner.state.has_error = true;
            }
        }
    }

    async fn stop(&self) {
        let dwell = self.lock().decide_pause();
        if let Some(timer) = dwell {
            timer.cancel();
        }
        self.media.pause();
        // Waits for an insert already in progress, so its record gets finalized.
        self.tracker
            .lock()
            .await
            .finalize_view(self.item_id, &self.session, false)
            .await;
    }

    fn spawn_dwell_timer(&self) -> DwellTimer {
        let armed = Arc::new(AtomicBool::new(true));
        let tracker = Arc::clone(&self.tracker);
        let session = self.session.clone();
        let item_id = self.item_id;
        let dwell = self.dwell;
        let flag = Arc::clone(&armed);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            let mut tracker = tracker.lock().await;
            if !flag.swap(false, Ordering::AcqRel) {
                return;
            }
            tracker.begin_view(item_id, &session).await;
        });
        DwellTimer { armed, handle }
    }

    pub async fn on_media_event(&self, event: MediaEvent) {
        match event {
            MediaEvent::Waiting => self.lock().state.is_buffering = true,
            MediaEvent::CanPlay | MediaEvent::Playing => self.lock().state.is_buffering = false,
            MediaEvent::TimeUpdate {
                current_secs,
                duration_secs,
            } => {
                self.lock().state.progress_percent = progress_percent(current_secs, duration_secs);
            }
            MediaEvent::Error(err) => {
                warn!(item = %self.item_id, error = %err, "media error");
                let mut inner = self.lock();
                inner.state.has_error = true;
                inner.state.is_buffering = false;
            }
            MediaEvent::Ended => self.on_ended().await,
        }
    }

    async fn on_ended(&self) {
        self.tracker
            .lock()
            .await
            .finalize_view(self.item_id, &self.session, true)
            .await;

        let loops = {
            let mut inner = self.lock();
            inner.state.progress_percent = 0.0;
            inner.wants_play
        };
        if loops {
            self.start(true, true).await;
        } else {
            self.lock().state.is_playing = false;
        }
    }

    /// Clears a playback error, reloads the source and tries again. Does
    /// nothing unless the player is in the error state.
    pub async fn retry(&self) {
        {
            let mut inner = self.lock();
            if !inner.state.has_error {
                return;
            }
            inner.state.has_error = false;
        }
        self.media.reload();
        let track_view = self.lock().should_autoplay();
        self.start(false, track_view).await;
    }

    /// Manual play/pause, independent of visibility.
    pub async fn toggle_play(&self) {
        if self.state().is_playing {
            let dwell = self.lock().decide_pause();
            if let Some(timer) = dwell {
                timer.cancel();
            }
            self.media.pause();
        } else {
            self.start(false, false).await;
        }
    }

    pub fn toggle_mute(&self) {
        let muted = {
            let mut inner = self.lock();
            inner.state.is_muted = !inner.state.is_muted;
            inner.state.is_muted
        };
        self.media.set_muted(muted);
    }

    /// Ends the viewing session: stops following visibility, pauses and
    /// finalizes any open view as incomplete.
    pub async fn unmount(self) {
        let follower = self.lock().follower.take();
        if let Some(follower) = follower {
            follower.abort();
        }
        self.stop().await;
    }
}

fn progress_percent(current_secs: f64, duration_secs: f64) -> f64 {
    if duration_secs.is_nan() || duration_secs <= 0.0 || !current_secs.is_finite() {
        return 0.0;
    }
    (current_secs / duration_secs * 100.0).clamp(0.0, 100.0)
}
