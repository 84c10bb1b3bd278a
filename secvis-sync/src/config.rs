//! Client and run configuration.

use crate::error::{SyncError, SyncResult};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Default sort key for the primary event query.
pub const DEFAULT_SORT_KEY: &str = "modificationSequenceNumber";

/// API access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Client-credentials id.
    pub client_id: String,
    /// Client-credentials secret.
    pub client_secret: String,
    /// Tenant id used in customer-scoped collection paths.
    pub customer_id: String,
    /// Base URL for collection endpoints (e.g. `https://api.cta.eu.amp.cisco.com`).
    pub api_base_url: String,
    /// Base URL for the token endpoint (e.g. `https://visibility.eu.amp.cisco.com`).
    pub token_base_url: String,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            customer_id: String::new(),
            api_base_url: "https://api.cta.eu.amp.cisco.com".to_string(),
            token_base_url: "https://visibility.eu.amp.cisco.com".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ApiConfig {
    /// Checks the config before any request is made.
    pub fn validate(&self) -> SyncResult<()> {
        if self.client_id.is_empty() {
            return Err(SyncError::Config("client_id is empty".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(SyncError::Config("client_secret is empty".to_string()));
        }
        if self.customer_id.is_empty() {
            return Err(SyncError::Config("customer_id is empty".to_string()));
        }
        self.api_base()?;
        Url::parse(&self.token_base_url)
            .map_err(|e| SyncError::Config(format!("token_base_url: {e}")))?;
        Ok(())
    }

    /// Parsed collection base URL.
    pub fn api_base(&self) -> SyncResult<Url> {
        Url::parse(&self.api_base_url).map_err(|e| SyncError::Config(format!("api_base_url: {e}")))
    }
}

/// Options for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Sort key of the primary query; must be strictly increasing per modification.
    pub sort_key: String,
    /// Page size requested for the event query. Server default when unset.
    pub page_size: Option<u32>,
    /// Load threat detections and assets concurrently, then alerts and threat intel.
    pub parallel_bulk_loads: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sort_key: DEFAULT_SORT_KEY.to_string(),
            page_size: None,
            parallel_bulk_loads: true,
        }
    }
}
