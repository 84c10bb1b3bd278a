//! Flat, enriched output rows.

use chrono::{DateTime, Utc};
use secvis_types::Record;
use serde::Serialize;
use serde_json::Value;

/// Timestamp format of `indexTime`.
pub const INDEX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Formats an index timestamp.
pub fn index_time(at: DateTime<Utc>) -> String {
    at.format(INDEX_TIME_FORMAT).to_string()
}

/// How a row relates its event to threat data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Event without any threat detection.
    Contextual,
    /// Event with a threat detection and one of its alerts.
    Convicting,
    /// Event with a threat detection that has no alerts, or that is missing.
    DetectionOnly,
}

/// One output line. Keys of absent objects are omitted entirely.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRow {
    #[serde(skip)]
    pub kind: RowKind,

    pub index_time: String,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_detected_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_modified_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_event_type_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_subtitle: Option<Value>,

    // Asset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumed_owner: Option<Value>,

    // Alert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_state: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<Value>,

    // Threat intel record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_category: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_sub_category: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Value>,

    // Threat detection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_asset_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threat_detection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Value>,

    // Security annotation carried on the event
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_annotation_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_annotation_attributes: Option<Value>,
}

/// Objects joined onto one event.
#[derive(Debug, Default, Clone, Copy)]
pub struct RowContext<'a> {
    pub asset: Option<&'a Record>,
    pub detection: Option<&'a Record>,
    pub threat_intel: Option<&'a Record>,
    pub alert: Option<&'a Record>,
}

fn field(record: Option<&Record>, key: &str) -> Option<Value> {
    record.and_then(|r| r.get(key)).cloned()
}

impl EnrichedRow {
    /// Flattens an event and whatever related objects were found.
    pub fn build(kind: RowKind, index_time: &str, event: &Record, ctx: RowContext<'_>) -> Self {
        let annotation = event.non_null("securityAnnotation");

        Self {
            kind,
            index_time: index_time.to_string(),
            event_id: event.id().to_string(),
            event_detected_at: event.get("detectedAt").cloned(),
            event_modified_at: event.get("modifiedAt").cloned(),
            security_event_type_id: event.get("securityEventTypeId").cloned(),
            event_title: event.get("title").cloned(),
            event_subtitle: event.get("subtitle").cloned(),

            assumed_owner: field(ctx.asset, "assumedOwner"),

            alert_id: ctx.alert.map(|a| a.id().to_string()),
            alert_state: field(ctx.alert, "state"),
            risk: field(ctx.alert, "risk"),

            threat_title: field(ctx.threat_intel, "title"),
            threat_category: field(ctx.threat_intel, "category"),
            threat_sub_category: field(ctx.threat_intel, "subcategory"),
            severity: field(ctx.threat_intel, "severity"),

            affected_asset_id: field(ctx.detection, "affectedAssetId"),
            threat_detection_id: ctx.detection.map(|d| d.id().to_string()),
            confidence: field(ctx.detection, "confidence"),

            security_annotation_id: annotation.and_then(|a| a.get("id")).cloned(),
            security_annotation_attributes: annotation
                .and_then(|a| a.get("requiredAttributes"))
                .cloned(),
        }
    }
}
