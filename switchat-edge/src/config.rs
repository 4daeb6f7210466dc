use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use uuid::Uuid;

/// Runtime settings. Secrets are optional at startup; handlers that need a
/// missing one answer 500 for that request only.
#[derive(Debug, Clone, Parser)]
#[command(name = "switchat-edge", version, about = "SWITCHAT edge handlers")]
pub struct EdgeConfig {
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:8787")]
    pub bind: SocketAddr,

    /// Hosted backend base URL. Without it an in-process store is used.
    #[arg(long, env = "BACKEND_URL")]
    pub backend_url: Option<String>,

    #[arg(long, env = "BACKEND_SERVICE_KEY", hide_env_values = true)]
    pub backend_service_key: Option<String>,

    #[arg(long, env = "BACKEND_TIMEOUT_SECS", default_value_t = 10)]
    pub backend_timeout_secs: u64,

    /// Snapshot file for the in-process store.
    #[arg(long, env = "MEMORY_STORE")]
    pub memory_store: Option<PathBuf>,

    /// Post every new account likes on signup.
    #[arg(long, env = "SEED_POST_ID")]
    pub seed_post_id: Option<Uuid>,

    #[arg(long, env = "MEDIA_API_KEY")]
    pub media_api_key: Option<String>,

    #[arg(long, env = "MEDIA_API_SECRET", hide_env_values = true)]
    pub media_api_secret: Option<String>,

    #[arg(long, env = "MEDIA_WS_URL")]
    pub media_ws_url: Option<String>,

    #[arg(long, env = "MEDIA_TOKEN_TTL_SECS", default_value_t = 6 * 60 * 60)]
    pub media_token_ttl_secs: u64,
}

impl EdgeConfig {
    pub fn media_credentials(&self) -> MediaCredentials {
        MediaCredentials {
            api_key: self.media_api_key.clone(),
            api_secret: self.media_api_secret.clone(),
            ws_url: self.media_ws_url.clone(),
            ttl: Duration::from_secs(self.media_token_ttl_secs),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MediaCredentials {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub ws_url: Option<String>,
    pub ttl: Duration,
}
