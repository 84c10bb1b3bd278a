//! Schema-less records with a guaranteed identity field.

use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Field names shared across collections.
pub mod fields {
    pub const ID: &str = "id";
    pub const THREAT_DETECTION_IDS: &str = "threatDetectionIds";
    pub const AFFECTED_ASSET_ID: &str = "affectedAssetId";
    pub const ALERT_IDS: &str = "alertIds";
    pub const THREAT_INTEL_RECORD_ID: &str = "threatIntelRecordId";
}

/// A single item of a collection page.
///
/// Wraps the JSON object as returned by the server. Construction fails unless
/// the object has a string `id`, so `id()` never needs to be fallible.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: String,
    fields: Map<String, Value>,
}

impl Record {
    /// Builds a record from a JSON object.
    pub fn from_map(fields: Map<String, Value>) -> Result<Self, Error> {
        let id = fields
            .get(fields::ID)
            .and_then(Value::as_str)
            .ok_or(Error::MissingId)?
            .to_string();
        Ok(Self { id, fields })
    }

    /// Builds a record from any JSON value.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            _ => Err(Error::NotAnObject),
        }
    }

    /// Returns the record's identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a raw field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a field only if present and not JSON `null`.
    #[must_use]
    pub fn non_null(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    /// Returns a string field.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Returns the string entries of an array field.
    ///
    /// Missing, `null` and non-array fields read as empty. Non-string entries
    /// are skipped.
    pub fn str_list(&self, key: &str) -> impl Iterator<Item = &str> {
        self.fields
            .get(key)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the record, returning the JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    // ── Foreign keys ─────────────────────────────────────────────

    /// Threat detections an event is linked to (usually one, may be none).
    pub fn threat_detection_ids(&self) -> impl Iterator<Item = &str> {
        self.str_list(fields::THREAT_DETECTION_IDS)
    }

    /// Asset an event or detection refers to.
    #[must_use]
    pub fn affected_asset_id(&self) -> Option<&str> {
        self.str_field(fields::AFFECTED_ASSET_ID)
    }

    /// Alerts a threat detection belongs to.
    pub fn alert_ids(&self) -> impl Iterator<Item = &str> {
        self.str_list(fields::ALERT_IDS)
    }

    /// Threat catalog entry a threat detection refers to.
    #[must_use]
    pub fn threat_intel_record_id(&self) -> Option<&str> {
        self.str_field(fields::THREAT_INTEL_RECORD_ID)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_map(map).map_err(serde::de::Error::custom)
    }
}
