//! Per-event MQTT publish sink (spec §6): each normalized report becomes
//! one retained-free QoS-1 publish to a per-device topic. This sink
//! bypasses the partitioned batching engine entirely — every event is
//! published as it arrives, matching the reference sink's one-event,
//! one-publish shape.

mod event;

pub use event::MqttEvent;

use async_trait::async_trait;
use collector_core::report::Report;
use collector_core::service::{CollectorError, CollectorService};
use collector_core::DeviceIdentity;
use rumqttc::{AsyncClient, QoS};
use tokio_util::sync::CancellationToken;

/// `collector/<collector_name>/device/<oui>-<product_class>-<serial_number>/event`,
/// matching the reference sink's topic shape.
fn topic_for(collector_name: &str, identity: &DeviceIdentity) -> String {
    format!("collector/{collector_name}/device/{identity}/event")
}

pub struct MqttCollectorService {
    client: AsyncClient,
    collector_name: String,
}

impl MqttCollectorService {
    pub fn new(client: AsyncClient, collector_name: impl Into<String>) -> Self {
        Self {
            client,
            collector_name: collector_name.into(),
        }
    }
}

#[async_trait]
impl CollectorService for MqttCollectorService {
    async fn collect(
        &self,
        _cancel: &CancellationToken,
        identity: &DeviceIdentity,
        reports: Vec<Report>,
    ) -> Result<(), CollectorError> {
        let topic = topic_for(&self.collector_name, identity);

        for report in reports {
            let event = MqttEvent::from_report(identity, report);
            let payload = event
                .to_wire_bytes()
                .map_err(|source| CollectorError::Internal(source.into()))?;

            self.client
                .publish(&topic, QoS::AtLeastOnce, false, payload)
                .await
                .map_err(|source| {
                    tracing::error!(%topic, error = %source, "mqtt publish failed");
                    CollectorError::Internal(source.into())
                })?;
            tracing::debug!(%topic, identity = %identity, "published mqtt event");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_embeds_device_identity() {
        let identity = DeviceIdentity::new("ACME", "RT", "1");
        assert_eq!(topic_for("100000", &identity), "collector/100000/device/ACME-RT-1/event");
    }
}
