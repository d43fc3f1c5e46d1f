//! The on-the-wire [`Event`] shape sent to the sink: one per report,
//! carrying exactly one [`DeviceIdentity`] and one collection time, per
//! spec §3's invariant.

use collector_core::report::{EventValue, Report};
use collector_core::DeviceIdentity;
use serde::Serialize;
use std::collections::BTreeMap;

/// Serializes as
/// `{"CollectionTime":"<RFC3339>","OUI":"<o>","ProductClass":"<p>","SerialNumber":"<s>","Parameters":{...}}`,
/// matching the reference sink's wire payload exactly.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    #[serde(rename = "CollectionTime")]
    pub collection_time: chrono::DateTime<chrono::FixedOffset>,
    #[serde(rename = "OUI")]
    pub oui: String,
    #[serde(rename = "ProductClass")]
    pub product_class: String,
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
    #[serde(rename = "Parameters")]
    pub parameters: BTreeMap<String, EventValue>,
}

impl Event {
    pub fn from_report(identity: &DeviceIdentity, report: Report) -> Self {
        Self {
            collection_time: report.collection_time,
            oui: identity.oui.clone(),
            product_class: identity.product_class.clone(),
            serial_number: identity.serial_number.clone(),
            parameters: report.parameters,
        }
    }

    /// UTF-8 JSON, 2-space indented, matching the reference sink's
    /// `json.MarshalIndent(event, "", "  ")`.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_core::parameter::ParameterValue;

    #[test]
    fn wire_shape_matches_reference_sink() {
        let identity = DeviceIdentity::new("ACME", "RT", "1");
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "Device.Uptime".to_string(),
            EventValue::Typed(ParameterValue::U32(3600)),
        );
        let report = Report {
            collection_time: chrono::DateTime::parse_from_rfc3339("2023-11-14T22:13:20Z").unwrap(),
            parameters,
        };

        let event = Event::from_report(&identity, report);
        let bytes = event.to_wire_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let decoded: serde_json::Value = serde_json::from_str(&text).unwrap();

        let decoded_time =
            chrono::DateTime::parse_from_rfc3339(decoded["CollectionTime"].as_str().unwrap()).unwrap();
        assert_eq!(decoded_time, event.collection_time);
        assert_eq!(decoded["OUI"], "ACME");
        assert_eq!(decoded["SerialNumber"], "1");
        assert_eq!(decoded["Parameters"]["Device.Uptime"], 3600);
        assert!(text.contains("\n  "), "expected 2-space indented JSON");
    }
}
