//! OAuth access tokens for the Earth Engine REST API.
//!
//! A service account signs a short-lived RS256 assertion and trades it for a
//! bearer token at Google's token endpoint. Tokens are cached until shortly
//! before expiry; the cache sits behind a `tokio::sync::Mutex` so concurrent
//! requests share a single exchange.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use heat_common::{HeatError, HeatResult};

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const EARTH_ENGINE_SCOPE: &str = "https://www.googleapis.com/auth/earthengine";

pub const ENV_CLIENT_EMAIL: &str = "EE_CLIENT_EMAIL";
pub const ENV_PRIVATE_KEY: &str = "EE_PRIVATE_KEY";
pub const ENV_PROJECT_ID: &str = "EE_PROJECT_ID";

/// Lifetime requested for each assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the token expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// A bearer token and when it stops being valid.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Still usable at `now` with the refresh margin applied.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + chrono::Duration::seconds(REFRESH_MARGIN_SECS) < expires_at,
            None => true,
        }
    }
}

/// Source of bearer tokens for outbound API calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> HeatResult<AccessToken>;
}

/// A pre-issued token, used as-is.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> HeatResult<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
            expires_at: None,
        })
    }
}

// ============================================================================
// Service account
// ============================================================================

/// Service-account identity as read from the environment.
#[derive(Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Read `EE_CLIENT_EMAIL`, `EE_PRIVATE_KEY` and `EE_PROJECT_ID`.
    pub fn from_env() -> HeatResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the three variables through `lookup`. Every missing or empty
    /// variable is named in the error.
    pub fn from_lookup<F>(lookup: F) -> HeatResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut read = |name: &'static str| match lookup(name).filter(|v| !v.trim().is_empty()) {
            Some(value) => value,
            None => {
                missing.push(name);
                String::new()
            }
        };

        let client_email = read(ENV_CLIENT_EMAIL);
        let private_key = read(ENV_PRIVATE_KEY);
        let project_id = read(ENV_PROJECT_ID);

        if !missing.is_empty() {
            return Err(HeatError::Configuration(format!(
                "Missing Earth Engine credentials: {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            client_email,
            // Keys pasted into .env files usually carry literal "\n".
            private_key: private_key.replace("\\n", "\n"),
            project_id,
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges signed assertions for access tokens and caches the result.
pub struct ServiceAccount {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token_uri: String,
    client: Client,
    cache: Mutex<Option<AccessToken>>,
}

impl ServiceAccount {
    pub fn new(key: ServiceAccountKey) -> HeatResult<Self> {
        Self::with_token_uri(key, DEFAULT_TOKEN_URI)
    }

    /// Use a different token endpoint.
    pub fn with_token_uri(key: ServiceAccountKey, token_uri: impl Into<String>) -> HeatResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| HeatError::Authentication(format!("Invalid service account private key: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| HeatError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            key,
            encoding_key,
            token_uri: token_uri.into(),
            client,
            cache: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.key.project_id
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> HeatResult<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: EARTH_ENGINE_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| HeatError::Authentication(format!("Failed to sign assertion: {e}")))
    }

    #[instrument(skip(self), fields(account = %self.key.client_email))]
    async fn exchange(&self, now: DateTime<Utc>) -> HeatResult<AccessToken> {
        let assertion = self.sign_assertion(now)?;
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| HeatError::Authentication(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HeatError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| HeatError::Authentication(format!("Malformed token response: {e}")))?;

        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        info!(expires_in = lifetime, "Obtained Earth Engine access token");
        Ok(AccessToken {
            token: token.access_token,
            expires_at: Some(now + chrono::Duration::seconds(lifetime)),
        })
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccount {
    async fn access_token(&self) -> HeatResult<AccessToken> {
        let mut cache = self.cache.lock().await;
        let now = Utc::now();

        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(now)) {
            debug!("Using cached access token");
            return Ok(token.clone());
        }

        let token = self.exchange(now).await?;
        *cache = Some(token.clone());
        Ok(token)
    }
}
