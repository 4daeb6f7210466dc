#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use switchat_core::{MediaElement, MediaError, MemoryBackend, PostKind, PostRow, Profile};
use tokio::sync::oneshot;
use uuid::Uuid;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 21, 12, 0, 0).unwrap()
}

pub fn post(author: Uuid, minutes_ago: i64) -> PostRow {
    PostRow {
        id: Uuid::new_v4(),
        user_id: author,
        media_url: Some(format!("https://cdn.example.com/{minutes_ago}.mp4")),
        caption: None,
        kind: PostKind::Video,
        created_at: base_time() - Duration::minutes(minutes_ago),
    }
}

pub fn profile(id: Uuid, username: &str) -> Profile {
    Profile {
        id,
        username: Some(username.to_string()),
        display_name: Some(username.to_uppercase()),
        avatar_url: None,
        is_verified: true,
        theme: None,
    }
}

/// `count` media posts by `author`, one minute apart.
pub async fn seed_posts(backend: &MemoryBackend, author: Uuid, count: i64) {
    for i in 0..count {
        backend.add_post(post(author, i + 1)).await;
    }
}

pub enum PlayOutcome {
    Resolve,
    Reject,
    Gate(oneshot::Receiver<Result<(), MediaError>>),
}

/// Scriptable media element that records every call.
#[derive(Default)]
pub struct FakeMedia {
    calls: Mutex<Vec<String>>,
    outcomes: Mutex<VecDeque<PlayOutcome>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(outcomes: Vec<PlayOutcome>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcomes: Mutex::new(outcomes.into()),
        }
    }

    pub fn push_outcome(&self, outcome: PlayOutcome) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn last_call(&self) -> Option<String> {
        self.calls().last().cloned()
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn seek_to_start(&self) {
        self.record("seek");
    }

    async fn play(&self) -> Result<(), MediaError> {
        self.record("play");
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PlayOutcome::Resolve);
        match outcome {
            PlayOutcome::Resolve => Ok(()),
            PlayOutcome::Reject => Err(MediaError::Rejected("autoplay blocked".into())),
            PlayOutcome::Gate(rx) => rx
                .await
                .unwrap_or_else(|_| Err(MediaError::Failed("gate dropped".into()))),
        }
    }

    fn pause(&self) {
        self.record("pause");
    }

    fn set_muted(&self, muted: bool) {
        self.record(format!("muted:{muted}"));
    }

    fn reload(&self) {
        self.record("reload");
    }
}
