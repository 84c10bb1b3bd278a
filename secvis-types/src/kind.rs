//! Collection kinds that records are loaded from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The collection a record belongs to.
///
/// Ids are only unique within one kind, so lookups are always scoped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ObjectKind {
    /// Security event, the primary collection.
    Event,
    /// Threat detection enriched with the ids of its alerts.
    ThreatDetection,
    /// Asset affected by an event.
    Asset,
    /// Alert raised for one or more threat detections.
    Alert,
    /// Threat catalog entry describing a detected threat.
    ThreatIntelRecord,
}

impl ObjectKind {
    /// Every kind, primary collection first.
    pub const ALL: [ObjectKind; 5] = [
        ObjectKind::Event,
        ObjectKind::ThreatDetection,
        ObjectKind::Asset,
        ObjectKind::Alert,
        ObjectKind::ThreatIntelRecord,
    ];

    /// Returns the kind's stable name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Event => "event",
            ObjectKind::ThreatDetection => "threat-detection",
            ObjectKind::Asset => "asset",
            ObjectKind::Alert => "alert",
            ObjectKind::ThreatIntelRecord => "threat-intel-record",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
