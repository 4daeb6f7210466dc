use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no authenticated viewer")]
    NotAuthenticated,
}

/// Failures reported by a media element.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The platform refused to start playback (autoplay policy, interrupted load...).
    #[error("playback rejected: {0}")]
    Rejected(String),
    #[error("media failed: {0}")]
    Failed(String),
}
