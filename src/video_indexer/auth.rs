//! Credentials for the Video Indexer service.
//!
//! Access works in two steps: a management-plane (ARM) token is obtained from a
//! [`CredentialProvider`], then exchanged for an account-scoped Video Indexer token.

use crate::config::CredentialSettings;
use crate::error::{GuardianError, Result};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// OAuth scope for Azure Resource Manager.
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Lifetime assumed when a token carries no readable expiry.
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 55;

/// A bearer token with its expiry.
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token with an explicit expiry.
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Create a token, reading the expiry from its JWT `exp` claim when present.
    pub fn from_jwt(token: impl Into<String>) -> Self {
        let token = token.into();
        let expires_at = jwt_expiry(&token)
            .unwrap_or_else(|| Utc::now() + ChronoDuration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES));
        Self { token, expires_at }
    }

    /// Whether the token is still valid `margin` from now.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        let margin = ChronoDuration::from_std(margin).unwrap_or_else(|_| ChronoDuration::zero());
        Utc::now() + margin < self.expires_at
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Read the `exp` claim from a JWT without verifying it.
fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}

/// Source of management-plane tokens.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Get an ARM bearer token.
    async fn management_token(&self) -> Result<AccessToken>;
}

/// A pre-issued ARM token (e.g. from `az account get-access-token`).
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenCredential {
    async fn management_token(&self) -> Result<AccessToken> {
        Ok(AccessToken::from_jwt(self.token.clone()))
    }
}

/// Service principal login via the OAuth2 client-credentials grant.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        Self {
            http,
            authority: authority.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        }
    }
}

#[async_trait]
impl CredentialProvider for ClientSecretCredential {
    #[instrument(skip(self), fields(tenant = %self.tenant_id))]
    async fn management_token(&self) -> Result<AccessToken> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);

        let response = self
            .http
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", MANAGEMENT_SCOPE),
            ])
            .send()
            .await
            .map_err(|e| GuardianError::Auth(format!("Failed to get Azure token: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(GuardianError::Auth(format!(
                "Failed to get Azure token ({}): {}",
                status, body
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| GuardianError::Auth(format!("Invalid token response: {}", e)))?;

        debug!("Obtained management token");
        Ok(match parsed.expires_in {
            Some(secs) => AccessToken::new(parsed.access_token, Utc::now() + ChronoDuration::seconds(secs)),
            None => AccessToken::from_jwt(parsed.access_token),
        })
    }
}

/// Build a credential provider from settings.
///
/// A static ARM token wins over a service principal.
pub fn credential_from_settings(
    settings: &CredentialSettings,
    http: reqwest::Client,
) -> Result<Arc<dyn CredentialProvider>> {
    if let Some(token) = settings.arm_token.as_deref().filter(|t| !t.is_empty()) {
        return Ok(Arc::new(StaticTokenCredential::new(token)));
    }

    match (&settings.tenant_id, &settings.client_id, &settings.client_secret) {
        (Some(tenant), Some(client), Some(secret)) => Ok(Arc::new(ClientSecretCredential::new(
            http,
            &settings.authority,
            tenant,
            client,
            secret,
        ))),
        _ => Err(GuardianError::Config(
            "No Azure credentials configured. Set AZURE_ARM_TOKEN, or AZURE_TENANT_ID, \
             AZURE_CLIENT_ID and AZURE_CLIENT_SECRET."
                .to_string(),
        )),
    }
}

/// Caches an account token until shortly before it expires.
///
/// With a zero margin every call refreshes. Refreshes happen under the write lock,
/// so concurrent callers never issue duplicate exchanges.
pub struct TokenCache {
    margin: Option<Duration>,
    slot: RwLock<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(refresh_margin: Duration) -> Self {
        Self {
            margin: (!refresh_margin.is_zero()).then_some(refresh_margin),
            slot: RwLock::new(None),
        }
    }

    /// Return the cached token if fresh, otherwise run `refresh` and store its result.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<AccessToken>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken>>,
    {
        let Some(margin) = self.margin else {
            return refresh().await;
        };

        if let Some(token) = self.slot.read().await.as_ref() {
            if token.is_fresh(margin) {
                return Ok(token.clone());
            }
        }

        let mut slot = self.slot.write().await;
        if let Some(token) = slot.as_ref() {
            if token.is_fresh(margin) {
                return Ok(token.clone());
            }
        }

        let token = refresh().await?;
        *slot = Some(token.clone());
        Ok(token)
    }
}
