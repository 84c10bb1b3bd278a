//! Client-credentials bearer token provider.
//!
//! Tokens are cached and refreshed transparently once they are about to
//! expire. Concurrent callers that find the cache stale share one refresh:
//! only the refresh path is serialized, reads of a valid token never wait on
//! each other.

use crate::clock::{Clock, SystemClock};
use crate::config::ApiConfig;
use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Path of the token endpoint, relative to the token base URL.
pub const TOKEN_PATH: &str = "/iroh/oauth2/token";

/// Advertised token lifetimes are shortened by this much, so a token is never
/// presented when it is about to expire mid-request.
pub const EXPIRY_MARGIN_SECS: i64 = 30;

/// The only authorization scheme the API accepts, spelled as it expects.
pub const AUTH_SCHEME: &str = "Bearer";

/// A bearer token and the instant it stops being handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
    valid_until: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: impl Into<String>, valid_until: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            valid_until,
        }
    }

    /// The raw access token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry with the safety margin already applied.
    pub fn valid_until(&self) -> DateTime<Utc> {
        self.valid_until
    }

    /// Value for the `Authorization` header, e.g. `Bearer abc`.
    pub fn header_value(&self) -> String {
        format!("{AUTH_SCHEME} {}", self.token)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

/// Obtains and caches bearer credentials for API requests.
pub struct TokenProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    clock: Arc<dyn Clock>,
    credential: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    /// Creates a provider using the wall clock.
    pub fn new(client: Client, config: &ApiConfig) -> Self {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    /// Creates a provider with a custom time source.
    pub fn with_clock(client: Client, config: &ApiConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            token_url: format!("{}{TOKEN_PATH}", config.token_base_url.trim_end_matches('/')),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            clock,
            credential: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Returns a valid credential, exchanging client credentials if the
    /// cached one is missing or stale.
    pub async fn authorize(&self) -> SyncResult<Credential> {
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        let _refresh = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        match self.exchange().await {
            Ok(credential) => {
                *self.credential.write().await = Some(credential.clone());
                Ok(credential)
            }
            Err(e) => {
                *self.credential.write().await = None;
                Err(e)
            }
        }
    }

    /// Drops the cached credential so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.credential.write().await = None;
    }

    async fn cached(&self) -> Option<Credential> {
        let now = self.clock.now();
        self.credential
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_valid_at(now))
            .cloned()
    }

    async fn exchange(&self) -> SyncResult<Credential> {
        debug!("Requesting access token from {}", self.token_url);
        let issued_at = self.clock.now();

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| SyncError::Auth(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Auth(format!(
                "token request returned {status}: {error}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Auth(format!("failed to parse token response: {e}")))?;

        if token_response.access_token.is_empty() {
            return Err(SyncError::Auth("token response has empty access_token".to_string()));
        }
        // Servers report "bearer"; anything that is not some casing of it is unusable.
        if let Some(token_type) = &token_response.token_type {
            if !token_type.eq_ignore_ascii_case(AUTH_SCHEME) {
                return Err(SyncError::Auth(format!(
                    "unsupported token type: {token_type}"
                )));
            }
        }

        let valid_until = token_response
            .expires_in
            .checked_sub(EXPIRY_MARGIN_SECS)
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                SyncError::Auth(format!(
                    "expires_in out of range: {}",
                    token_response.expires_in
                ))
            })?;
        debug!("Obtained access token valid until {}", valid_until);

        Ok(Credential::new(token_response.access_token, valid_until))
    }
}
