use pretty_assertions::assert_eq;
use secvis_types::{Error, ObjectKind, Record};
use serde_json::json;

// ── Construction ────────────────────────────────────────────────

#[test]
fn record_from_value_keeps_id_and_fields() {
    let record = Record::from_value(json!({"id": "e1", "title": "Malware"})).unwrap();
    assert_eq!(record.id(), "e1");
    assert_eq!(record.str_field("title"), Some("Malware"));
}

#[test]
fn record_without_id_is_rejected() {
    let err = Record::from_value(json!({"title": "no id"})).unwrap_err();
    assert!(matches!(err, Error::MissingId));
}

#[test]
fn record_with_numeric_id_is_rejected() {
    let err = Record::from_value(json!({"id": 42})).unwrap_err();
    assert!(matches!(err, Error::MissingId));
}

#[test]
fn record_from_array_is_rejected() {
    let err = Record::from_value(json!(["id"])).unwrap_err();
    assert!(matches!(err, Error::NotAnObject));
}

#[test]
fn record_deserialize_validates_id() {
    let ok: Record = serde_json::from_str(r#"{"id":"a1","state":"open"}"#).unwrap();
    assert_eq!(ok.id(), "a1");

    let bad = serde_json::from_str::<Record>(r#"{"state":"open"}"#);
    assert!(bad.is_err());
}

#[test]
fn record_serializes_as_plain_object() {
    let record = Record::from_value(json!({"id": "a1", "risk": 7})).unwrap();
    let value = serde_json::to_value(&record).unwrap();
    assert_eq!(value, json!({"id": "a1", "risk": 7}));
}

// ── Field access ────────────────────────────────────────────────

#[test]
fn non_null_skips_json_null() {
    let record = Record::from_value(json!({"id": "e1", "securityAnnotation": null})).unwrap();
    assert!(record.get("securityAnnotation").is_some());
    assert!(record.non_null("securityAnnotation").is_none());
}

#[test]
fn str_list_reads_missing_and_null_as_empty() {
    let record = Record::from_value(json!({"id": "e1", "alertIds": null})).unwrap();
    assert_eq!(record.alert_ids().count(), 0);
    assert_eq!(record.threat_detection_ids().count(), 0);
}

#[test]
fn str_list_skips_non_string_entries() {
    let record = Record::from_value(json!({"id": "td1", "alertIds": ["a1", 5, null, "a2"]})).unwrap();
    let ids: Vec<&str> = record.alert_ids().collect();
    assert_eq!(ids, vec!["a1", "a2"]);
}

// ── Foreign keys ────────────────────────────────────────────────

#[test]
fn event_foreign_keys() {
    let event = Record::from_value(json!({
        "id": "e1",
        "threatDetectionIds": ["td1", "td2"],
        "affectedAssetId": "as1"
    }))
    .unwrap();

    let ids: Vec<&str> = event.threat_detection_ids().collect();
    assert_eq!(ids, vec!["td1", "td2"]);
    assert_eq!(event.affected_asset_id(), Some("as1"));
}

#[test]
fn detection_foreign_keys() {
    let detection = Record::from_value(json!({
        "id": "td1",
        "alertIds": ["a1"],
        "threatIntelRecordId": "ti1"
    }))
    .unwrap();

    assert_eq!(detection.alert_ids().collect::<Vec<_>>(), vec!["a1"]);
    assert_eq!(detection.threat_intel_record_id(), Some("ti1"));
}

// ── ObjectKind ──────────────────────────────────────────────────

#[test]
fn object_kind_names_are_stable() {
    let names: Vec<String> = ObjectKind::ALL.iter().map(ToString::to_string).collect();
    assert_eq!(
        names,
        vec!["event", "threat-detection", "asset", "alert", "threat-intel-record"]
    );
}

#[test]
fn object_kind_serde_uses_kebab_case() {
    let json = serde_json::to_string(&ObjectKind::ThreatIntelRecord).unwrap();
    assert_eq!(json, "\"threat-intel-record\"");
}
