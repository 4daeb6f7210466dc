//! Viewport intersection tracking for a single feed item.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::trace;

use crate::config::PlaybackConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Threshold {
    Single(f64),
    List(Vec<f64>),
}

impl Threshold {
    fn sorted(&self) -> Vec<f64> {
        let mut values = match self {
            Threshold::Single(v) => vec![*v],
            Threshold::List(vs) if vs.is_empty() => vec![0.0],
            Threshold::List(vs) => vs.clone(),
        };
        for v in values.iter_mut() {
            *v = v.clamp(0.0, 1.0);
        }
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    pub threshold: Threshold,
    /// Scrolling ancestor; `None` is the viewport.
    pub root: Option<String>,
    pub root_margin: String,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            threshold: Threshold::Single(0.7),
            root: None,
            root_margin: "0px".to_string(),
        }
    }
}

impl VisibilityConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold: Threshold::Single(threshold),
            ..Self::default()
        }
    }
}

/// Autoplay detectors use the threshold from the playback settings.
impl From<&PlaybackConfig> for VisibilityConfig {
    fn from(config: &PlaybackConfig) -> Self {
        Self::with_threshold(config.visibility_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntersectionState {
    pub is_intersecting: bool,
    pub intersection_ratio: f64,
}

#[derive(Debug)]
pub struct VisibilityDetector {
    config: VisibilityConfig,
    thresholds: Vec<f64>,
    target: Option<String>,
    // Index of the threshold band the last report fell in.
    band: Option<usize>,
    tx: watch::Sender<IntersectionState>,
}

impl VisibilityDetector {
    pub fn new(config: VisibilityConfig) -> Self {
        let thresholds = config.threshold.sorted();
        let (tx, _rx) = watch::channel(IntersectionState::default());
        Self {
            config,
            thresholds,
            target: None,
            band: None,
            tx,
        }
    }

    pub fn config(&self) -> &VisibilityConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<IntersectionState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> IntersectionState {
        *self.tx.borrow()
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn attach(&mut self, target: impl Into<String>) {
        self.target = Some(target.into());
        self.band = None;
        self.tx.send_replace(IntersectionState::default());
    }

    /// Stops observing. The last reported state is reset to not-intersecting.
    pub fn detach(&mut self) {
        if self.target.take().is_some() {
            self.band = None;
            self.tx.send_replace(IntersectionState::default());
        }
    }

    /// Feeds the current visible fraction of the target. Returns the new state
    /// when it was reported, i.e. on the first observation after `attach` and
    /// whenever a threshold is crossed.
    pub fn observe(&mut self, ratio: f64) -> Option<IntersectionState> {
        let target = self.target.as_deref()?;
        let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
        let band = self.band_for(ratio);
        if self.band == Some(band) {
            return None;
        }
        self.band = Some(band);

        let state = IntersectionState {
            is_intersecting: band > 0,
            intersection_ratio: ratio,
        };
        trace!(item = target, ratio, is_intersecting = state.is_intersecting, "intersection changed");
        self.tx.send_replace(state);
        Some(state)
    }

    fn band_for(&self, ratio: f64) -> usize {
        self.thresholds
            .iter()
            .filter(|&&t| if t == 0.0 { ratio > 0.0 } else { ratio >= t })
            .count()
    }
}

impl Drop for VisibilityDetector {
    fn drop(&mut self) {
        self.detach();
    }
}
