//! Router setup and the listener loop.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use switchat_core::{BackendConfig, MemoryBackend, RestBackend, SharedBackend};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EdgeConfig, MediaCredentials};
use crate::handlers;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppContext {
    pub backend: SharedBackend,
    pub seed_post_id: Option<Uuid>,
    pub media: MediaCredentials,
}

impl AppContext {
    pub async fn from_config(config: &EdgeConfig) -> anyhow::Result<Self> {
        let backend: SharedBackend = match &config.backend_url {
            Some(url) => {
                let rest = RestBackend::new(&BackendConfig {
                    url: url.clone(),
                    anon_key: config.backend_service_key.clone().unwrap_or_default(),
                    request_timeout_seconds: config.backend_timeout_secs,
                })?;
                info!(%url, "using hosted backend");
                Arc::new(rest)
            }
            None => {
                warn!("BACKEND_URL not set, using the in-process store");
                match &config.memory_store {
                    Some(path) => Arc::new(MemoryBackend::load_from(path).await),
                    None => Arc::new(MemoryBackend::in_memory()),
                }
            }
        };
        Ok(Self {
            backend,
            seed_post_id: config.seed_post_id,
            media: config.media_credentials(),
        })
    }
}

pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/auto-like", post(handlers::auto_like))
        .route("/news", get(handlers::news))
        .route("/media-token", post(handlers::media_token))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn run(config: EdgeConfig) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(&config).await?;
    let app = create_router(ctx);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(addr = %config.bind, "edge server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
