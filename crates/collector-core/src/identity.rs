use std::fmt;

/// TR-069 device identity: OUI, ProductClass, SerialNumber.
///
/// Constructed per request from URL query parameters and treated as
/// immutable for the lifetime of an [`crate::service::CollectorService`] call. All
/// events for a given identity route to the same partition for the life of
/// one process, since routing hashes `Display`'s output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub oui: String,
    pub product_class: String,
    pub serial_number: String,
}

impl DeviceIdentity {
    pub fn new(
        oui: impl Into<String>,
        product_class: impl Into<String>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            oui: oui.into(),
            product_class: product_class.into(),
            serial_number: serial_number.into(),
        }
    }
}

/// `"{oui}-{product_class}-{serial_number}"` — the exact byte sequence the
/// partition router hashes, matching the original's
/// `fmt.Sprintf("%s-%s-%s", oui, productClass, serialNumber)`.
impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.oui, self.product_class, self.serial_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_routing_key_shape() {
        let id = DeviceIdentity::new("ACME", "RT", "1");
        assert_eq!(id.to_string(), "ACME-RT-1");
    }
}
