use pretty_assertions::assert_eq;
use secvis_sync::{JsonLinesSink, ObjectCache, RowKind, RowSink, join_rows};
use secvis_types::{ObjectKind, Record};
use serde_json::{Value, json};

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

fn cache_with(entries: &[(ObjectKind, Value)]) -> ObjectCache {
    let mut cache = ObjectCache::new();
    for (kind, value) in entries {
        cache.insert(*kind, record(value.clone()));
    }
    cache
}

// ── ObjectCache ─────────────────────────────────────────────────

#[test]
fn cache_lookups_are_scoped_by_kind() {
    let cache = cache_with(&[
        (ObjectKind::Alert, json!({"id": "x", "state": "open"})),
        (ObjectKind::Asset, json!({"id": "x", "assumedOwner": "carol"})),
    ]);

    assert_eq!(cache.get(ObjectKind::Alert, "x").unwrap().str_field("state"), Some("open"));
    assert_eq!(
        cache.get(ObjectKind::Asset, "x").unwrap().str_field("assumedOwner"),
        Some("carol")
    );
    assert!(cache.get(ObjectKind::ThreatDetection, "x").is_none());
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.count(ObjectKind::Alert), 1);
}

#[test]
fn cache_missing_keys_are_none() {
    let cache = ObjectCache::new();
    assert!(cache.get(ObjectKind::Asset, "missing").is_none());
    assert!(cache.lookup(ObjectKind::Asset, None).is_none());
    assert!(cache.is_empty());
}

#[test]
fn cache_later_insert_replaces_earlier() {
    let mut cache = ObjectCache::new();
    cache.insert(ObjectKind::Alert, record(json!({"id": "a1", "risk": 1})));
    let replaced = cache.insert(ObjectKind::Alert, record(json!({"id": "a1", "risk": 2})));

    assert!(replaced.is_some());
    assert_eq!(cache.get(ObjectKind::Alert, "a1").unwrap().get("risk"), Some(&json!(2)));
}

// ── join_rows ───────────────────────────────────────────────────

#[test]
fn detection_with_several_alerts_yields_row_per_alert() {
    let events = vec![record(json!({"id": "e1", "threatDetectionIds": ["td1"]}))];
    let cache = cache_with(&[
        (ObjectKind::ThreatDetection, json!({"id": "td1", "alertIds": ["a1", "a2", "a3"]})),
        (ObjectKind::Alert, json!({"id": "a1"})),
        (ObjectKind::Alert, json!({"id": "a3"})),
    ]);

    let rows = join_rows(&events, &cache, "t");
    let alerts: Vec<Option<&str>> = rows.iter().map(|r| r.alert_id.as_deref()).collect();

    // a2 is referenced but not loaded: row kept, alert fields omitted.
    assert_eq!(alerts, vec![Some("a1"), None, Some("a3")]);
    assert!(rows.iter().all(|r| r.kind == RowKind::Convicting));
    assert!(rows.iter().all(|r| r.threat_detection_id.as_deref() == Some("td1")));
}

#[test]
fn detection_without_alerts_yields_one_row() {
    let events = vec![record(json!({"id": "e1", "threatDetectionIds": ["td1"]}))];
    let cache = cache_with(&[
        (
            ObjectKind::ThreatDetection,
            json!({"id": "td1", "alertIds": [], "threatIntelRecordId": "ti1"}),
        ),
        (ObjectKind::ThreatIntelRecord, json!({"id": "ti1", "title": "Zeus"})),
    ]);

    let rows = join_rows(&events, &cache, "t");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].kind, RowKind::DetectionOnly);
    assert_eq!(rows[0].threat_detection_id.as_deref(), Some("td1"));
    assert_eq!(rows[0].threat_title, Some(json!("Zeus")));
    assert_eq!(rows[0].alert_id, None);
}

#[test]
fn mixed_events_preserve_order_and_multiplicity() {
    let events = vec![
        record(json!({"id": "e1", "threatDetectionIds": []})),
        record(json!({"id": "e2", "threatDetectionIds": ["td1", "td2"]})),
        record(json!({"id": "e3"})),
    ];
    let cache = cache_with(&[
        (ObjectKind::ThreatDetection, json!({"id": "td1", "alertIds": ["a1", "a2"]})),
        (ObjectKind::ThreatDetection, json!({"id": "td2", "alertIds": []})),
    ]);

    let rows = join_rows(&events, &cache, "t");
    let shape: Vec<(&str, RowKind)> = rows.iter().map(|r| (r.event_id.as_str(), r.kind)).collect();

    assert_eq!(
        shape,
        vec![
            ("e1", RowKind::Contextual),
            ("e2", RowKind::Convicting),
            ("e2", RowKind::Convicting),
            ("e2", RowKind::DetectionOnly),
            ("e3", RowKind::Contextual),
        ]
    );
}

#[test]
fn missing_asset_is_not_an_error() {
    let events = vec![record(json!({"id": "e1", "affectedAssetId": "unknown"}))];
    let rows = join_rows(&events, &ObjectCache::new(), "t");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].assumed_owner, None);
}

// ── JsonLinesSink ───────────────────────────────────────────────

#[tokio::test]
async fn json_lines_sink_writes_one_object_per_line() {
    let events = vec![
        record(json!({"id": "e1"})),
        record(json!({"id": "e2"})),
    ];
    let rows = join_rows(&events, &ObjectCache::new(), "t");

    let mut sink = JsonLinesSink::new(Vec::new());
    for row in &rows {
        sink.emit(row).await.unwrap();
    }
    sink.flush().await.unwrap();
    assert_eq!(sink.lines(), 2);

    let output = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(
        lines,
        vec![
            json!({"indexTime": "t", "eventId": "e1"}),
            json!({"indexTime": "t", "eventId": "e2"}),
        ]
    );
}
