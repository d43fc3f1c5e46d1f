use collector_core::report::{EventValue, Report};
use collector_core::DeviceIdentity;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct DaprEvent {
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

impl DaprEvent {
    pub fn from_report(identity: &DeviceIdentity, report: Report) -> Self {
        Self {
            collection_time: report.collection_time,
            oui: identity.oui.clone(),
            product_class: identity.product_class.clone(),
            serial_number: identity.serial_number.clone(),
            parameters: report.parameters,
        }
    }
}
