//! Google ID token verification against Google's published signing keys

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};

const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const KEY_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Identity carried by a verified Google ID token
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleIdentity {
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

#[derive(Clone)]
pub struct GoogleVerifier {
    client: reqwest::Client,
    client_id: Option<String>,
    keys: Arc<RwLock<Option<(JwkSet, Instant)>>>,
}

impl GoogleVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            client_id,
            keys: Arc::new(RwLock::new(None)),
        }
    }

    /// Check signature, audience, issuer and expiry of an ID token
    pub async fn verify(&self, id_token: &str) -> AppResult<GoogleIdentity> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Google sign-in is not configured".to_string()))?;

        let header = decode_header(id_token)
            .map_err(|_| AppError::Authentication("Invalid Google token".to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| AppError::Authentication("Invalid Google token".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let identity = decode::<GoogleIdentity>(id_token, &key, &validation)
            .map_err(|e| {
                tracing::debug!("Google token rejected: {}", e);
                AppError::Authentication("Invalid Google token".to_string())
            })?
            .claims;

        if !identity.email_verified {
            return Err(AppError::Authentication("Google email is not verified".to_string()));
        }

        Ok(identity)
    }

    async fn decoding_key(&self, kid: &str) -> AppResult<DecodingKey> {
        {
            let cached = self.keys.read().await;
            if let Some((set, fetched_at)) = cached.as_ref() {
                if fetched_at.elapsed() < KEY_CACHE_TTL {
                    if let Some(jwk) = set.find(kid) {
                        return key_from_jwk(jwk);
                    }
                }
            }
        }

        // Unknown kid or stale cache: Google rotates keys, refetch once
        let set = self.fetch_keys().await?;
        let key = set
            .find(kid)
            .ok_or_else(|| AppError::Authentication("Unknown Google signing key".to_string()))
            .and_then(key_from_jwk);

        *self.keys.write().await = Some((set, Instant::now()));
        key
    }

    async fn fetch_keys(&self) -> AppResult<JwkSet> {
        self.client
            .get(GOOGLE_CERTS_URL)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch Google keys: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Internal(format!("Failed to fetch Google keys: {}", e)))?
            .json::<JwkSet>()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid Google key set: {}", e)))
    }
}

fn key_from_jwk(jwk: &jsonwebtoken::jwk::Jwk) -> AppResult<DecodingKey> {
    DecodingKey::from_jwk(jwk)
        .map_err(|e| AppError::Internal(format!("Invalid Google signing key: {}", e)))
}
