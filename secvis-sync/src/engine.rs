//! Bulk-load and join engine.
//!
//! One run goes through these phases:
//!
//! 1. **Collect**: drain the event collection, resuming after the stored
//!    checkpoint, and gather the threat-detection and asset ids it refers to.
//! 2. **Bulk-load**: fetch threat detections and assets by id, then the
//!    alerts and threat-intel records those detections refer to, into an
//!    `ObjectCache`.
//! 3. **Join**: walk the events in their original order and emit one row per
//!    event, per (detection, alert) pair, or per alert-less detection.
//! 4. **Checkpoint**: store the event iterator's final cursor.
//!
//! Any failure aborts the run before the checkpoint is written, so a re-run
//! with the old checkpoint reprocesses the same window.

use crate::cache::ObjectCache;
use crate::checkpoint::CheckpointStore;
use crate::client::ApiClient;
use crate::clock::{Clock, SystemClock};
use crate::config::SyncConfig;
use crate::cursor::{CollectionQuery, CursorIterator, RecordSource};
use crate::error::{RunError, RunPhase, SyncError, SyncResult};
use crate::row::{EnrichedRow, RowContext, RowKind, index_time};
use crate::sink::RowSink;
use secvis_types::{ObjectKind, Record};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Events of one run and the ids they reference.
#[derive(Debug, Default, Clone)]
pub struct CollectedEvents {
    /// Events in server order.
    pub events: Vec<Record>,
    pub threat_detection_ids: BTreeSet<String>,
    pub affected_asset_ids: BTreeSet<String>,
}

impl CollectedEvents {
    pub fn push(&mut self, event: Record) {
        self.threat_detection_ids
            .extend(event.threat_detection_ids().map(String::from));
        if let Some(asset_id) = event.affected_asset_id() {
            self.affected_asset_ids.insert(asset_id.to_string());
        }
        self.events.push(event);
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events: usize,
    pub rows: usize,
    pub convicting_rows: usize,
    pub contextual_rows: usize,
    pub detection_only_rows: usize,
    pub threat_detections: usize,
    pub assets: usize,
    pub alerts: usize,
    pub threat_intel_records: usize,
    pub previous_checkpoint: Option<String>,
    pub checkpoint: Option<String>,
}

impl RunSummary {
    /// True if this run stored a new cursor.
    pub fn checkpoint_advanced(&self) -> bool {
        self.checkpoint != self.previous_checkpoint
    }
}

/// Orchestrates one incremental sync.
pub struct BulkJoinEngine {
    api: ApiClient,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
}

impl BulkJoinEngine {
    pub fn new(api: ApiClient, config: SyncConfig) -> Self {
        Self {
            api,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses a custom clock for `indexTime`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Runs collect, bulk-load and join, then advances the checkpoint.
    pub async fn run(
        &self,
        checkpoint: &dyn CheckpointStore,
        sink: &mut dyn RowSink,
    ) -> Result<RunSummary, RunError> {
        let previous = checkpoint
            .load()
            .await
            .map_err(|e| RunError::new(RunPhase::CheckpointRead, e))?;
        info!(
            "Starting sync after cursor {}",
            previous.as_deref().unwrap_or("<none>")
        );

        let mut events = self
            .events(previous.clone())
            .map_err(|e| RunError::new(RunPhase::Collect, e))?;
        let collected = self
            .collect(&mut events)
            .await
            .map_err(|e| RunError::new(RunPhase::Collect, e))?;

        let cache = self
            .bulk_load(&collected)
            .await
            .map_err(|e| RunError::new(RunPhase::BulkLoad, e))?;

        let mut summary = RunSummary {
            events: collected.events.len(),
            threat_detections: cache.count(ObjectKind::ThreatDetection),
            assets: cache.count(ObjectKind::Asset),
            alerts: cache.count(ObjectKind::Alert),
            threat_intel_records: cache.count(ObjectKind::ThreatIntelRecord),
            previous_checkpoint: previous.clone(),
            checkpoint: previous.clone(),
            ..Default::default()
        };

        let rows = join_rows(&collected.events, &cache, &index_time(self.clock.now()));
        for row in &rows {
            sink.emit(row)
                .await
                .map_err(|e| RunError::new(RunPhase::Join, e))?;
            match row.kind {
                RowKind::Convicting => summary.convicting_rows += 1,
                RowKind::Contextual => summary.contextual_rows += 1,
                RowKind::DetectionOnly => summary.detection_only_rows += 1,
            }
        }
        sink.flush()
            .await
            .map_err(|e| RunError::new(RunPhase::Join, e))?;
        summary.rows = rows.len();
        info!(
            "Emitted {} rows for {} events ({} convicting, {} contextual, {} detection-only)",
            summary.rows,
            summary.events,
            summary.convicting_rows,
            summary.contextual_rows,
            summary.detection_only_rows
        );

        match events.end_cursor() {
            Some(cursor) if previous.as_deref() != Some(cursor) => {
                checkpoint
                    .store(cursor)
                    .await
                    .map_err(|e| RunError::new(RunPhase::CheckpointWrite, e))?;
                info!("Checkpoint advanced to {}", cursor);
                summary.checkpoint = Some(cursor.to_string());
            }
            _ => debug!("Checkpoint unchanged"),
        }

        Ok(summary)
    }

    /// Iterator over events sorted by the configured key, resuming after `cursor`.
    pub fn events(&self, cursor: Option<String>) -> SyncResult<CursorIterator> {
        let mut query = CollectionQuery::get(self.api.routes().events())
            .param("sort", &self.config.sort_key)
            .after(cursor);
        if let Some(size) = self.config.page_size {
            query = query.param("size", size);
        }
        self.api.collection(query)
    }

    /// Drains the primary source.
    pub async fn collect(&self, events: &mut dyn RecordSource) -> SyncResult<CollectedEvents> {
        let mut collected = CollectedEvents::default();
        while let Some(event) = events.next_record().await? {
            collected.push(event);
        }
        info!(
            "Collected {} events referencing {} threat detections and {} assets",
            collected.events.len(),
            collected.threat_detection_ids.len(),
            collected.affected_asset_ids.len()
        );
        Ok(collected)
    }

    /// Loads every object the collected events refer to, directly or through
    /// their threat detections.
    pub async fn bulk_load(&self, collected: &CollectedEvents) -> SyncResult<ObjectCache> {
        let detections_and_assets = (
            self.load_by_ids(ObjectKind::ThreatDetection, &collected.threat_detection_ids),
            self.load_by_ids(ObjectKind::Asset, &collected.affected_asset_ids),
        );
        let (detections, assets) = if self.config.parallel_bulk_loads {
            tokio::try_join!(detections_and_assets.0, detections_and_assets.1)?
        } else {
            (detections_and_assets.0.await?, detections_and_assets.1.await?)
        };

        // Alert and threat-intel ids are only known once detections are in.
        let mut alert_ids = BTreeSet::new();
        let mut threat_intel_ids = BTreeSet::new();
        for detection in &detections {
            alert_ids.extend(detection.alert_ids().map(String::from));
            threat_intel_ids.extend(detection.threat_intel_record_id().map(String::from));
        }

        let alerts_and_intel = (
            self.load_by_ids(ObjectKind::Alert, &alert_ids),
            self.load_by_ids(ObjectKind::ThreatIntelRecord, &threat_intel_ids),
        );
        let (alerts, threat_intel) = if self.config.parallel_bulk_loads {
            tokio::try_join!(alerts_and_intel.0, alerts_and_intel.1)?
        } else {
            (alerts_and_intel.0.await?, alerts_and_intel.1.await?)
        };

        let mut cache = ObjectCache::new();
        cache.extend(ObjectKind::ThreatDetection, detections);
        cache.extend(ObjectKind::Asset, assets);
        cache.extend(ObjectKind::Alert, alerts);
        cache.extend(ObjectKind::ThreatIntelRecord, threat_intel);
        Ok(cache)
    }

    /// Fetches all objects of `kind` whose ids are in `ids`.
    pub async fn load_by_ids(
        &self,
        kind: ObjectKind,
        ids: &BTreeSet<String>,
    ) -> SyncResult<Vec<Record>> {
        if ids.is_empty() {
            debug!("No {} ids referenced, skipping bulk load", kind);
            return Ok(Vec::new());
        }
        let route = self
            .api
            .routes()
            .bulk(kind)
            .ok_or_else(|| SyncError::Config(format!("{kind} cannot be bulk-loaded")))?;

        let body = route.filter_body(ids.iter().map(String::as_str));
        let mut iter = self.api.collection(CollectionQuery::post(route.path, body))?;
        let records = iter.drain().await?;
        info!(
            "Bulk-loaded {} of {} requested {} objects",
            records.len(),
            ids.len(),
            kind
        );
        Ok(records)
    }
}

/// Joins events with cached objects, preserving event order.
///
/// - An event without threat detections yields one contextual row.
/// - Each referenced detection yields one row per alert id it lists.
/// - A detection listing no alerts, or one missing from the cache, still
///   yields one row without alert fields.
///
/// Missing references never fail the join; their fields are left out.
pub fn join_rows(events: &[Record], cache: &ObjectCache, index_time: &str) -> Vec<EnrichedRow> {
    let mut rows = Vec::new();

    for event in events {
        let asset = cache.lookup(ObjectKind::Asset, event.affected_asset_id());
        if asset.is_none() {
            debug!("Event {} has no cached asset", event.id());
        }

        let mut detection_ids = event.threat_detection_ids().peekable();
        if detection_ids.peek().is_none() {
            rows.push(EnrichedRow::build(
                RowKind::Contextual,
                index_time,
                event,
                RowContext {
                    asset,
                    ..Default::default()
                },
            ));
            continue;
        }

        for detection_id in detection_ids {
            let detection = cache.get(ObjectKind::ThreatDetection, detection_id);
            if detection.is_none() {
                debug!(
                    "Threat detection {} of event {} not found",
                    detection_id,
                    event.id()
                );
            }
            let threat_intel = detection.and_then(|d| {
                cache.lookup(ObjectKind::ThreatIntelRecord, d.threat_intel_record_id())
            });
            let ctx = RowContext {
                asset,
                detection,
                threat_intel,
                alert: None,
            };

            let mut alert_ids = detection.into_iter().flat_map(|d| d.alert_ids()).peekable();
            if alert_ids.peek().is_none() {
                rows.push(EnrichedRow::build(RowKind::DetectionOnly, index_time, event, ctx));
                continue;
            }
            for alert_id in alert_ids {
                let alert = cache.get(ObjectKind::Alert, alert_id);
                rows.push(EnrichedRow::build(
                    RowKind::Convicting,
                    index_time,
                    event,
                    RowContext { alert, ..ctx },
                ));
            }
        }
    }

    rows
}
