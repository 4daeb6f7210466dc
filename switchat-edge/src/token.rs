//! Join tokens for the real-time media service.
//!
//! Tokens are HS256 JWTs signed with the media API secret. The client passes
//! them straight to the media SDK and never looks inside.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MediaCredentials;
use crate::error::ApiError;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClaims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinToken {
    pub token: String,
    pub url: String,
}

pub struct MediaTokenIssuer {
    api_key: String,
    encoding_key: EncodingKey,
    ws_url: String,
    ttl: Duration,
}

impl MediaTokenIssuer {
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        ws_url: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            encoding_key: EncodingKey::from_secret(api_secret.into().as_bytes()),
            ws_url: ws_url.into(),
            ttl,
        }
    }

    /// Builds an issuer, or reports which setting is missing.
    pub fn from_credentials(credentials: &MediaCredentials) -> Result<Self, ApiError> {
        fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ApiError> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::Config(format!("{name} is not set")))
        }
        Ok(Self::new(
            required(&credentials.api_key, "MEDIA_API_KEY")?,
            required(&credentials.api_secret, "MEDIA_API_SECRET")?,
            required(&credentials.ws_url, "MEDIA_WS_URL")?,
            credentials.ttl,
        ))
    }

    pub fn issue(&self, identity: &str, room: &str, can_publish: bool) -> Result<JoinToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = JoinClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            nbf: now,
            exp: now + self.ttl.as_secs() as i64,
            video: VideoGrant {
                room: room.to_string(),
                room_join: true,
                can_publish,
                can_subscribe: true,
                can_publish_data: true,
            },
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        Ok(JoinToken {
            token,
            url: self.ws_url.clone(),
        })
    }
}

/// Checks signature and expiry and returns the claims.
pub fn verify(token: &str, secret: &str) -> Result<JoinClaims, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<JoinClaims>(token, &key, &Validation::default())?;
    Ok(data.claims)
}
