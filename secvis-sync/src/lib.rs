//! Incremental sync engine for paginated security-event collections.
//!
//! Pulls security events from a cursor-paginated REST API, bulk-loads the
//! threat detections, assets, alerts and threat-intel records they refer to,
//! and emits one flat row per event/detection/alert combination. Each run
//! resumes exactly where the previous successful run stopped.
//!
//! ## Components
//!
//! - **TokenProvider**: caches a client-credentials bearer token and
//!   refreshes it shortly before it expires
//! - **PageFetcher**: one authorized GET or POST, decoded into a page envelope
//! - **CursorIterator**: lazy iteration across pages, tracking the end cursor
//! - **BulkJoinEngine**: collect, bulk-load, join, checkpoint
//! - **CheckpointStore**: persists the cursor between runs
//!
//! # Example
//!
//! ```no_run
//! use secvis_sync::{ApiClient, ApiConfig, BulkJoinEngine, FileCheckpointStore, JsonLinesSink, SyncConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ApiConfig {
//!     client_id: "id".to_string(),
//!     client_secret: "secret".to_string(),
//!     customer_id: "customer".to_string(),
//!     ..Default::default()
//! };
//! let engine = BulkJoinEngine::new(ApiClient::new(&config)?, SyncConfig::default());
//! let checkpoint = FileCheckpointStore::new("events_end_cursor.txt");
//! let mut sink = JsonLinesSink::new(tokio::io::stdout());
//! let summary = engine.run(&checkpoint, &mut sink).await?;
//! println!("{} rows", summary.rows);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod checkpoint;
mod client;
pub mod clock;
mod config;
pub mod cursor;
pub mod engine;
mod error;
pub mod page;
pub mod routes;
pub mod row;
pub mod sink;

pub use auth::{Credential, TokenProvider};
pub use cache::ObjectCache;
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use client::ApiClient;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiConfig, DEFAULT_SORT_KEY, SyncConfig};
pub use cursor::{CollectionQuery, CursorIterator, CursorPhase, RecordSource};
pub use engine::{BulkJoinEngine, CollectedEvents, RunSummary, join_rows};
pub use error::{RunError, RunPhase, SyncError, SyncResult};
pub use page::{PageEnvelope, PageFetcher, PageInfo};
pub use routes::{BulkRoute, Routes};
pub use row::{EnrichedRow, RowContext, RowKind};
pub use sink::{JsonLinesSink, MemorySink, RowSink};
