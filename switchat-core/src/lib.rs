pub mod backend;
pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod playback;
pub mod session;
pub mod views;
pub mod visibility;

pub use backend::{FeedBackend, MemoryBackend, PostQuery, RestBackend, SharedBackend};
pub use config::{AppConfig, BackendConfig, FeedConfig, PlaybackConfig};
pub use error::{FeedError, MediaError};
pub use feed::{FeedLoader, FeedState, SharedFeedState, DEFAULT_PAGE_SIZE};
pub use models::{
    Cursor, FeedItem, LocationTier, NewsArticle, PostKind, PostRow, Profile, ProfileTheme,
    ViewRecord,
};
pub use playback::{MediaElement, MediaEvent, PlaybackController, PlaybackState};
pub use session::Session;
pub use views::{ViewSession, ViewTracker};
pub use visibility::{IntersectionState, Threshold, VisibilityConfig, VisibilityDetector};
