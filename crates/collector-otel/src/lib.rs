//! OpenTelemetry metric-mapping sink (spec §6): rather than forwarding
//! events downstream, each configured parameter name is mapped to an
//! OTel instrument and every report's matching parameters are recorded
//! as measurements directly. Parameters with no configured instrument are
//! dropped. This sink bypasses the partitioned batching engine entirely.

pub mod instrument;

pub use instrument::{Instrument, InstrumentKind, InstrumentOptions};

use async_trait::async_trait;
use collector_core::report::Report;
use collector_core::service::{CollectorError, CollectorService};
use collector_core::DeviceIdentity;
use opentelemetry::metrics::Meter;
use opentelemetry::KeyValue;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

pub struct OtelCollectorService {
    instruments: HashMap<String, Instrument>,
}

impl OtelCollectorService {
    pub fn new(meter: &Meter, options: &[InstrumentOptions]) -> Self {
        let instruments = options
            .iter()
            .map(|opts| (opts.parameter_name.clone(), Instrument::new(meter, opts)))
            .collect();
        Self { instruments }
    }
}

#[async_trait]
impl CollectorService for OtelCollectorService {
    async fn collect(
        &self,
        _cancel: &CancellationToken,
        identity: &DeviceIdentity,
        reports: Vec<Report>,
    ) -> Result<(), CollectorError> {
        let attributes = [
            KeyValue::new("OUI", identity.oui.clone()),
            KeyValue::new("ProductClass", identity.product_class.clone()),
            KeyValue::new("SerialNumber", identity.serial_number.clone()),
        ];

        for report in reports {
            for (parameter_name, value) in &report.parameters {
                match self.instruments.get(parameter_name) {
                    Some(instrument) => {
                        instrument.measure(value, &attributes).map_err(|source| {
                            tracing::error!(%parameter_name, error = %source, "failed to record measurement");
                            CollectorError::Internal(anyhow::anyhow!(source))
                        })?;
                    }
                    None => {
                        tracing::trace!(%parameter_name, "no instrument configured, dropping parameter");
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collector_core::report::EventValue;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use std::collections::BTreeMap;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn unconfigured_parameter_is_silently_dropped() {
        let provider = SdkMeterProvider::builder().build();
        let meter = provider.meter("collector");

        let options = vec![InstrumentOptions {
            parameter_name: "Device.Uptime".to_string(),
            name: "device_uptime".to_string(),
            kind: InstrumentKind::Int64Counter,
            description: "uptime".to_string(),
            unit: "s".to_string(),
        }];

        let service = OtelCollectorService::new(&meter, &options);
        let identity = DeviceIdentity::new("ACME", "RT", "1");

        let mut parameters = BTreeMap::new();
        parameters.insert(
            "Device.Uptime".to_string(),
            EventValue::Typed(collector_core::parameter::ParameterValue::U32(5)),
        );
        parameters.insert(
            "Device.Unconfigured".to_string(),
            EventValue::Json(serde_json::json!(1)),
        );

        let report = Report {
            collection_time: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            parameters,
        };

        let cancel = CancellationToken::new();
        service.collect(&cancel, &identity, vec![report]).await.unwrap();
    }
}
