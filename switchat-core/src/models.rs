use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Voice,
    #[default]
    Video,
}

/// Row shape of a post as returned by the backend, before the profile join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media_url: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub kind: PostKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub media_url: Option<String>,
    pub caption: Option<String>,
    pub kind: PostKind,
    pub created_at: DateTime<Utc>,
    pub profile: Profile,
}

impl FeedItem {
    pub fn from_row(row: PostRow, profile: Profile) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            media_url: row.media_url,
            caption: row.caption,
            kind: row.kind,
            created_at: row.created_at,
            profile,
        }
    }

    pub fn has_media(&self) -> bool {
        self.media_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub theme: Option<ProfileTheme>,
}

impl Profile {
    /// Placeholder used when the author is missing from the bulk profile fetch.
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            username: None,
            display_name: None,
            avatar_url: None,
            is_verified: false,
            theme: None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.username.is_none() && self.display_name.is_none()
    }
}

/// Profile page background. Each variant carries only the fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileTheme {
    Solid {
        color: String,
    },
    Gradient {
        from: String,
        to: String,
        #[serde(default)]
        angle: u16,
    },
    Image {
        url: String,
        #[serde(default = "default_overlay_opacity")]
        overlay_opacity: f32,
    },
}

fn default_overlay_opacity() -> f32 {
    0.4
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub video_id: Uuid,
    pub user_id: Uuid,
    pub watch_duration: u64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl ViewRecord {
    pub fn provisional(video_id: Uuid, user_id: Uuid) -> Self {
        Self {
            id: None,
            video_id,
            user_id,
            watch_duration: 0,
            completed: false,
            created_at: Utc::now(),
        }
    }
}

/// Pagination marker: creation time of the oldest item fetched so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor(Option<DateTime<Utc>>);

impl Cursor {
    pub fn start() -> Self {
        Self(None)
    }

    pub fn at(created_at: DateTime<Utc>) -> Self {
        Self(Some(created_at))
    }

    pub fn before(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    pub fn is_start(&self) -> bool {
        self.0.is_none()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LocationTier {
    Local,
    Regional,
    National,
    #[default]
    Global,
}

impl LocationTier {
    /// Lenient parse; anything unrecognised is treated as global.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" | "city" => Self::Local,
            "regional" | "state" => Self::Regional,
            "national" | "country" => Self::National,
            _ => Self::Global,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Regional => "regional",
            Self::National => "national",
            Self::Global => "global",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub tier: LocationTier,
}
