//! Dapr pub/sub sink (spec §6). The reference sink drives Dapr's gRPC
//! client SDK; no Rust equivalent exists in this stack, so this port talks
//! to the Dapr sidecar's HTTP publish API directly with `reqwest` — the
//! same transport Dapr's own SDKs use under the hood, and a crate this
//! workspace already depends on for the Dapr "bypass" concern generally
//! (see DESIGN.md).

mod event;

pub use event::DaprEvent;

use async_trait::async_trait;
use collector_core::report::Report;
use collector_core::service::{CollectorError, CollectorService};
use collector_core::DeviceIdentity;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// `<topic_prefix>/device/<oui>-<product_class>-<serial_number>/event`.
fn topic_for(topic_prefix: &str, identity: &DeviceIdentity) -> String {
    format!("{topic_prefix}/device/{identity}/event")
}

pub struct DaprCollectorService {
    http: Client,
    sidecar_base_url: String,
    pubsub_name: String,
    topic_prefix: String,
}

impl DaprCollectorService {
    pub fn new(
        http: Client,
        sidecar_base_url: impl Into<String>,
        pubsub_name: impl Into<String>,
        topic_prefix: impl Into<String>,
    ) -> Self {
        Self {
            http,
            sidecar_base_url: sidecar_base_url.into(),
            pubsub_name: pubsub_name.into(),
            topic_prefix: topic_prefix.into(),
        }
    }
}

#[async_trait]
impl CollectorService for DaprCollectorService {
    async fn collect(
        &self,
        _cancel: &CancellationToken,
        identity: &DeviceIdentity,
        reports: Vec<Report>,
    ) -> Result<(), CollectorError> {
        let topic = topic_for(&self.topic_prefix, identity);
        let url = format!(
            "{}/v1.0/publish/{}/{}",
            self.sidecar_base_url.trim_end_matches('/'),
            self.pubsub_name,
            topic
        );

        for report in reports {
            let event = DaprEvent::from_report(identity, report);
            let response = self
                .http
                .post(&url)
                .json(&event)
                .send()
                .await
                .map_err(|source| {
                    tracing::error!(%url, error = %source, "dapr sidecar publish failed");
                    CollectorError::Internal(source.into())
                })?;

            if !response.status().is_success() {
                let status = response.status();
                tracing::error!(%url, %status, "dapr sidecar rejected publish");
                return Err(CollectorError::Internal(anyhow::anyhow!(
                    "dapr sidecar returned {status}"
                )));
            }
            tracing::debug!(%url, identity = %identity, "published dapr event");
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
        assert_eq!(
            topic_for("bulk-data", &identity),
            "bulk-data/device/ACME-RT-1/event"
        );
    }
}
