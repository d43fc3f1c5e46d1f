//! Wire shape published to the MQTT broker. Unlike the Event-Hubs-style
//! event, this one carries no `CollectionTime` — the reference sink's MQTT
//! payload drops it, relying on publish order and broker timestamps
//! instead (see DESIGN.md).

use collector_core::report::{EventValue, Report};
use collector_core::DeviceIdentity;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct MqttEvent {
    #[serde(rename = "OUI")]
    pub oui: String,
    #[serde(rename = "ProductClass")]
    pub product_class: String,
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
    #[serde(rename = "Parameters")]
    pub parameters: BTreeMap<String, EventValue>,
}

impl MqttEvent {
    pub fn from_report(identity: &DeviceIdentity, report: Report) -> Self {
        Self {
            oui: identity.oui.clone(),
            product_class: identity.product_class.clone(),
            serial_number: identity.serial_number.clone(),
            parameters: report.parameters,
        }
    }

    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_core::parameter::ParameterValue;

    #[test]
    fn wire_shape_omits_collection_time() {
        let identity = DeviceIdentity::new("ACME", "RT", "1");
        let mut parameters = BTreeMap::new();
        parameters.insert("Device.Uptime".to_string(), EventValue::Typed(ParameterValue::U32(10)));
        let report = Report {
            collection_time: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            parameters,
        };

        let event = MqttEvent::from_report(&identity, report);
        let decoded: serde_json::Value = serde_json::from_slice(&event.to_wire_bytes().unwrap()).unwrap();
        assert!(decoded.get("CollectionTime").is_none());
        assert_eq!(decoded["OUI"], "ACME");
    }
}
