//! Owned bundle of HTTP client, token provider and routes.

use crate::auth::TokenProvider;
use crate::clock::{Clock, SystemClock};
use crate::config::ApiConfig;
use crate::cursor::{CollectionQuery, CursorIterator};
use crate::error::{SyncError, SyncResult};
use crate::page::PageFetcher;
use crate::routes::Routes;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Entry point for talking to the API.
///
/// Every iterator created from one client shares its token provider, so a
/// token is fetched once and reused until it nears expiry.
#[derive(Clone)]
pub struct ApiClient {
    tokens: Arc<TokenProvider>,
    fetcher: PageFetcher,
    routes: Routes,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> SyncResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &ApiConfig, clock: Arc<dyn Clock>) -> SyncResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        let tokens = Arc::new(TokenProvider::with_clock(client.clone(), config, clock));
        let fetcher = PageFetcher::new(client, Arc::clone(&tokens), config.api_base()?);

        Ok(Self {
            tokens,
            fetcher,
            routes: Routes::new(&config.customer_id),
        })
    }

    pub fn tokens(&self) -> &Arc<TokenProvider> {
        &self.tokens
    }

    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    pub fn routes(&self) -> &Routes {
        &self.routes
    }

    /// Creates an iterator over a collection.
    pub fn collection(&self, query: CollectionQuery) -> SyncResult<CursorIterator> {
        CursorIterator::new(self.fetcher.clone(), query)
    }
}
