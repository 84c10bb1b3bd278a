//! Single-page requests against collection endpoints.

use crate::auth::TokenProvider;
use crate::error::{SyncError, SyncResult};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Url};
use secvis_types::Record;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Query parameter carrying the resumption cursor.
pub const AFTER_PARAM: &str = "after";

/// Pagination metadata of a page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// One decoded page of a collection.
///
/// Both `items` and `pageInfo.hasNextPage` are mandatory; a body missing
/// either fails to decode.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope {
    pub items: Vec<Record>,
    pub page_info: PageInfo,
}

impl PageEnvelope {
    pub fn has_next_page(&self) -> bool {
        self.page_info.has_next_page
    }

    /// Continuation URL reported by the server, ignoring empty strings.
    pub fn next_url(&self) -> Option<&str> {
        self.page_info.next.as_deref().filter(|s| !s.is_empty())
    }

    pub fn end_cursor(&self) -> Option<&str> {
        self.page_info.end_cursor.as_deref()
    }
}

/// Decodes a page body.
pub fn decode_page(body: &[u8]) -> SyncResult<PageEnvelope> {
    serde_json::from_slice(body)
        .map_err(|e| SyncError::Protocol(format!("malformed page envelope: {e}")))
}

/// Returns `url` with its `after` parameter replaced by `cursor`.
pub fn with_after(url: &Url, cursor: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != AFTER_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(AFTER_PARAM, cursor);
    next
}

/// Performs authorized page requests relative to the API base URL.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    tokens: Arc<TokenProvider>,
    base: Url,
}

impl PageFetcher {
    pub fn new(client: Client, tokens: Arc<TokenProvider>, base: Url) -> Self {
        Self {
            client,
            tokens,
            base,
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves an absolute URL or a host-relative path against the base.
    pub fn resolve(&self, reference: &str) -> SyncResult<Url> {
        self.base
            .join(reference)
            .map_err(|e| SyncError::Protocol(format!("invalid url {reference:?}: {e}")))
    }

    /// Fetches one page. Sends a GET without `body`, a JSON POST with it.
    pub async fn fetch(&self, url: &Url, body: Option<&Value>) -> SyncResult<PageEnvelope> {
        let credential = self.tokens.authorize().await?;

        debug!("Fetching page {} ({})", url, if body.is_some() { "POST" } else { "GET" });

        let request = match body {
            Some(body) => self.client.post(url.clone()).json(body),
            None => self.client.get(url.clone()),
        };

        let response = request
            .header(AUTHORIZATION, credential.header_value())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("request to {url} failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            return Err(SyncError::Transport(format!("{url} returned {status}: {error}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(format!("read body of {url} failed: {e}")))?;

        decode_page(&bytes)
    }

    /// Works out where the page after `page` lives.
    ///
    /// `pageInfo.next` wins when present. Otherwise the original query is
    /// reissued with `after` set to the latest cursor seen. Returns `None`
    /// when the server reports no further pages.
    pub fn continuation(
        &self,
        query: &Url,
        page: &PageEnvelope,
        latest_cursor: Option<&str>,
    ) -> SyncResult<Option<Url>> {
        if !page.has_next_page() {
            return Ok(None);
        }
        if let Some(next) = page.next_url() {
            return self.resolve(next).map(Some);
        }
        match page.end_cursor().or(latest_cursor) {
            Some(cursor) => Ok(Some(with_after(query, cursor))),
            None => Err(SyncError::Protocol(
                "hasNextPage is true but neither next nor endCursor is present".to_string(),
            )),
        }
    }
}
