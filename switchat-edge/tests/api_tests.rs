//! Router-level tests for the edge handlers, run against the in-process store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use switchat_core::backend::memory::RoomAccess;
use switchat_core::MemoryBackend;
use switchat_edge::token::verify;
use switchat_edge::{create_router, AppContext, MediaCredentials};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "media-secret";

fn credentials() -> MediaCredentials {
    MediaCredentials {
        api_key: Some("media-key".into()),
        api_secret: Some(SECRET.into()),
        ws_url: Some("wss://media.example.com".into()),
        ttl: Duration::from_secs(600),
    }
}

fn app(backend: &MemoryBackend, seed_post_id: Option<Uuid>, media: MediaCredentials) -> axum::Router {
    create_router(AppContext {
        backend: Arc::new(backend.clone()),
        seed_post_id,
        media,
    })
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json_body) => request
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_is_ok() {
    let backend = MemoryBackend::in_memory();
    let (status, body) = send(&app(&backend, None, credentials()), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn auto_like_likes_seed_post_once() {
    let backend = MemoryBackend::in_memory();
    let seed = Uuid::new_v4();
    let user = Uuid::new_v4();
    let router = app(&backend, Some(seed), credentials());

    let (status, body) = send(&router, "POST", "/auto-like", None, Some(json!({ "user_id": user }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["liked"], true);
    assert_eq!(body["post_id"], seed.to_string());

    // Webhook shape, same user: still one like.
    let (status, _) = send(&router, "POST", "/auto-like", None, Some(json!({ "record": { "id": user } }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(backend.has_liked(seed, user).await);
    assert_eq!(backend.like_count(seed).await, 1);
}

#[tokio::test]
async fn auto_like_errors() {
    let backend = MemoryBackend::in_memory();

    let unconfigured = app(&backend, None, credentials());
    let (status, body) = send(&unconfigured, "POST", "/auto-like", None, Some(json!({ "user_id": Uuid::new_v4() }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "server configuration error");

    let configured = app(&backend, Some(Uuid::new_v4()), credentials());
    let (status, _) = send(&configured, "POST", "/auto-like", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn news_defaults_to_global_and_honours_tier() {
    let backend = MemoryBackend::in_memory();
    let router = app(&backend, None, credentials());

    let (status, global) = send(&router, "GET", "/news", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(global.as_array().unwrap().iter().all(|a| a["tier"] == "global"));

    let (_, local) = send(&router, "GET", "/news?tier=Local", None, None).await;
    let local = local.as_array().unwrap();
    assert!(!local.is_empty());
    assert!(local.iter().all(|a| a["tier"] == "local"));

    let (_, again) = send(&router, "GET", "/news?tier=local", None, None).await;
    assert_eq!(again.as_array().unwrap(), local);
}

async fn room_backend() -> (MemoryBackend, Uuid, Uuid) {
    let backend = MemoryBackend::in_memory();
    let host = Uuid::new_v4();
    let guest = Uuid::new_v4();
    backend.register_token("host-token", host).await;
    backend.register_token("guest-token", guest).await;
    backend
        .set_room(
            "lounge",
            RoomAccess {
                open: true,
                speakers: [host].into_iter().collect(),
                listeners: Default::default(),
            },
        )
        .await;
    (backend, host, guest)
}

#[tokio::test]
async fn media_token_grants_speaker_access() {
    let (backend, host, _) = room_backend().await;
    let router = app(&backend, None, credentials());

    let (status, body) = send(
        &router,
        "POST",
        "/media-token",
        Some("host-token"),
        Some(json!({ "room_id": "lounge", "speaker": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "wss://media.example.com");

    let claims = verify(body["token"].as_str().unwrap(), SECRET).unwrap();
    assert_eq!(claims.iss, "media-key");
    assert_eq!(claims.sub, host.to_string());
    assert_eq!(claims.video.room, "lounge");
    assert!(claims.video.can_publish);
    assert_eq!(claims.exp - claims.nbf, 600);
}

#[tokio::test]
async fn media_token_listener_and_refusals() {
    let (backend, _, _) = room_backend().await;
    let router = app(&backend, None, credentials());

    let (status, body) = send(
        &router,
        "POST",
        "/media-token",
        Some("guest-token"),
        Some(json!({ "room_id": "lounge" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let claims = verify(body["token"].as_str().unwrap(), SECRET).unwrap();
    assert!(!claims.video.can_publish);

    let (status, _) = send(
        &router,
        "POST",
        "/media-token",
        Some("guest-token"),
        Some(json!({ "room_id": "lounge", "speaker": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        "POST",
        "/media-token",
        Some("nobody"),
        Some(json!({ "room_id": "lounge" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&router, "POST", "/media-token", None, Some(json!({ "room_id": "lounge" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &router,
        "POST",
        "/media-token",
        Some("host-token"),
        Some(json!({ "room_id": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn media_token_without_secrets_is_server_error() {
    let (backend, _, _) = room_backend().await;
    let router = app(
        &backend,
        None,
        MediaCredentials {
            api_secret: None,
            ..credentials()
        },
    );

    let (status, _) = send(
        &router,
        "POST",
        "/media-token",
        Some("host-token"),
        Some(json!({ "room_id": "lounge", "speaker": true })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
