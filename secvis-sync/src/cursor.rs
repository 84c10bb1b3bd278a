//! Lazy, restartable iteration over paginated collections.
//!
//! A `CursorIterator` walks a collection page by page, handing out records in
//! exactly the order the server returns them. It never reorders or
//! deduplicates. The most recent `endCursor` is available at any time so
//! progress can be checkpointed; an iterator built later with that cursor
//! resumes right after the last page consumed.

use crate::error::{SyncError, SyncResult};
use crate::page::{PageEnvelope, PageFetcher, with_after};
use async_trait::async_trait;
use futures::Stream;
use reqwest::Url;
use secvis_types::Record;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::debug;

/// What to iterate over.
#[derive(Debug, Clone, Default)]
pub struct CollectionQuery {
    /// Collection path, relative to the API base URL.
    pub path: String,
    /// Query parameters sent with every request (sort key, page size, ...).
    pub params: Vec<(String, String)>,
    /// Cursor to resume after.
    pub cursor: Option<String>,
    /// JSON body; when set every page is requested with POST.
    pub body: Option<Value>,
}

impl CollectionQuery {
    /// A GET query over a collection.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// A POST query carrying a filter body.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            path: path.into(),
            body: Some(body),
            ..Default::default()
        }
    }

    /// Adds a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Resumes after `cursor`, if any.
    pub fn after(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// A lazily produced sequence of records that ends with `Ok(None)`.
#[async_trait]
pub trait RecordSource: Send {
    /// Returns the next record, or `None` once the sequence is drained.
    async fn next_record(&mut self) -> SyncResult<Option<Record>>;

    /// Latest resumption cursor observed so far.
    fn end_cursor(&self) -> Option<&str>;

    /// Collects every remaining record.
    async fn drain(&mut self) -> SyncResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record().await? {
            records.push(record);
        }
        Ok(records)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPhase {
    /// No page requested yet.
    Unstarted,
    /// At least one page fetched and more may follow.
    HasPage,
    /// The last page has been fetched and every item handed out.
    Exhausted,
}

/// Iterator over every record of a paginated collection.
pub struct CursorIterator {
    fetcher: PageFetcher,
    query_url: Url,
    body: Option<Value>,
    next_url: Option<Url>,
    end_cursor: Option<String>,
    buffer: VecDeque<Record>,
    phase: CursorPhase,
    pages_fetched: usize,
}

impl CursorIterator {
    /// Builds an iterator. No request is made until the first `has_next`.
    pub fn new(fetcher: PageFetcher, query: CollectionQuery) -> SyncResult<Self> {
        let mut query_url = fetcher.resolve(&query.path)?;
        if !query.params.is_empty() {
            query_url.query_pairs_mut().extend_pairs(&query.params);
        }

        let first_url = match &query.cursor {
            Some(cursor) => with_after(&query_url, cursor),
            None => query_url.clone(),
        };

        Ok(Self {
            fetcher,
            query_url,
            body: query.body,
            next_url: Some(first_url),
            end_cursor: None,
            buffer: VecDeque::new(),
            phase: CursorPhase::Unstarted,
            pages_fetched: 0,
        })
    }

    /// Returns true if another record is available, fetching pages as needed.
    ///
    /// Empty intermediate pages are skipped, so `false` means the collection
    /// is fully drained.
    pub async fn has_next(&mut self) -> SyncResult<bool> {
        loop {
            if !self.buffer.is_empty() {
                return Ok(true);
            }
            let Some(url) = self.next_url.clone() else {
                self.phase = CursorPhase::Exhausted;
                return Ok(false);
            };
            self.fetch_page(url).await?;
        }
    }

    /// Returns the next record, or `SyncError::Exhausted` if there is none.
    pub async fn next(&mut self) -> SyncResult<Record> {
        if !self.has_next().await? {
            return Err(SyncError::Exhausted);
        }
        self.buffer.pop_front().ok_or(SyncError::Exhausted)
    }

    /// Returns the next record, or `None` at the end.
    pub async fn try_next(&mut self) -> SyncResult<Option<Record>> {
        if self.has_next().await? {
            Ok(self.buffer.pop_front())
        } else {
            Ok(None)
        }
    }

    /// The most recent cursor seen, valid mid-iteration.
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    pub fn phase(&self) -> CursorPhase {
        self.phase
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Turns the iterator into a stream that ends after the last record.
    pub fn into_stream(self) -> impl Stream<Item = SyncResult<Record>> + Send {
        futures::stream::try_unfold(self, |mut iter| async move {
            Ok(iter.try_next().await?.map(|record| (record, iter)))
        })
    }

    // On failure `next_url` is left in place, so a later call re-requests
    // the same page instead of skipping it.
    async fn fetch_page(&mut self, url: Url) -> SyncResult<()> {
        let page: PageEnvelope = self.fetcher.fetch(&url, self.body.as_ref()).await?;
        self.pages_fetched += 1;

        if let Some(cursor) = page.end_cursor() {
            self.end_cursor = Some(cursor.to_string());
        }
        let next_url = self
            .fetcher
            .continuation(&self.query_url, &page, self.end_cursor.as_deref())?;
        // The body is fixed per iterator, so an unchanged URL means the same page again.
        if next_url.as_ref() == Some(&url) {
            return Err(SyncError::Protocol(format!(
                "continuation does not advance past {url}"
            )));
        }
        self.next_url = next_url;

        debug!(
            "Fetched page {} of {} with {} items (more: {})",
            self.pages_fetched,
            self.query_url.path(),
            page.items.len(),
            self.next_url.is_some()
        );

        self.buffer.extend(page.items);
        self.phase = CursorPhase::HasPage;
        Ok(())
    }
}

#[async_trait]
impl RecordSource for CursorIterator {
    async fn next_record(&mut self) -> SyncResult<Option<Record>> {
        self.try_next().await
    }

    fn end_cursor(&self) -> Option<&str> {
        CursorIterator::end_cursor(self)
    }
}
