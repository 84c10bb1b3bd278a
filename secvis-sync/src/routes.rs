//! Collection paths and bulk-filter bodies.

use secvis_types::ObjectKind;
use serde_json::{Value, json};

/// Where to bulk-load a kind of object and which filter key selects ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRoute {
    pub path: String,
    pub filter_key: &'static str,
}

impl BulkRoute {
    /// Builds `{"filter": {<filter_key>: [ids...]}}`.
    pub fn filter_body<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Value {
        let ids: Vec<&str> = ids.into_iter().collect();
        json!({ "filter": { self.filter_key: ids } })
    }
}

/// Builds collection paths for one customer.
#[derive(Debug, Clone)]
pub struct Routes {
    customer_id: String,
}

impl Routes {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
        }
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    /// Security events enriched with the ids of their threat detections.
    pub fn events(&self) -> String {
        format!(
            "/threat-detection/customer/{}/enriched-events-with-threat-detection-ids",
            self.customer_id
        )
    }

    /// Plain alert listing.
    pub fn alerts(&self) -> String {
        format!("/alert-management/customer/{}/alerts", self.customer_id)
    }

    /// Bulk route for a secondary collection. Events have none.
    pub fn bulk(&self, kind: ObjectKind) -> Option<BulkRoute> {
        let c = &self.customer_id;
        let (path, filter_key) = match kind {
            ObjectKind::Event => return None,
            ObjectKind::ThreatDetection => (
                format!(
                    "/alert-management/customer/{c}/enriched-threat-detections-with-alert-ids/search"
                ),
                "threatDetectionIds",
            ),
            ObjectKind::Asset => (
                format!("/asset-management/customer/{c}/assets/search"),
                "assetId",
            ),
            ObjectKind::Alert => (
                format!("/alert-management/customer/{c}/alerts/search"),
                "alertIds",
            ),
            ObjectKind::ThreatIntelRecord => {
                ("/threat-catalog/records".to_string(), "threatIntelRecordId")
            }
        };
        Some(BulkRoute { path, filter_key })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_scoped_paths() {
        let routes = Routes::new("cust-1");
        assert_eq!(
            routes.events(),
            "/threat-detection/customer/cust-1/enriched-events-with-threat-detection-ids"
        );
        assert_eq!(routes.alerts(), "/alert-management/customer/cust-1/alerts");
    }

    #[test]
    fn events_have_no_bulk_route() {
        assert!(Routes::new("c").bulk(ObjectKind::Event).is_none());
    }

    #[test]
    fn threat_intel_route_is_not_customer_scoped() {
        let route = Routes::new("c").bulk(ObjectKind::ThreatIntelRecord).unwrap();
        assert_eq!(route.path, "/threat-catalog/records");
        assert_eq!(route.filter_key, "threatIntelRecordId");
    }

    #[test]
    fn filter_body_shape() {
        let route = Routes::new("c").bulk(ObjectKind::Asset).unwrap();
        let body = route.filter_body(["as1", "as2"]);
        assert_eq!(body, json!({"filter": {"assetId": ["as1", "as2"]}}));
    }
}
