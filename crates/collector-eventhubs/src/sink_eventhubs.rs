//! Production [`Sink`] backed by a real Event Hubs namespace via the
//! `azeventhubs` crate. Modeled on the reference sink's use of the
//! corresponding Go SDK (`azeventhubs.ProducerClient`): one shared
//! `EventHubProducerClient` per process, one `EventDataBatch` per
//! partition under assembly at a time (spec §6).

use crate::sink::{BatchAddError, Sink, SinkBatch};
use async_trait::async_trait;
use azeventhubs::producer::{
    CreateBatchOptions, EventHubProducerClient, EventHubProducerClientOptions, SendEventOptions,
};
use azeventhubs::EventData;

pub struct EventHubsSink {
    producer: EventHubProducerClient,
}

impl EventHubsSink {
    pub async fn connect(connection_string: &str, event_hub_name: &str) -> anyhow::Result<Self> {
        let producer = EventHubProducerClient::new_from_connection_string(
            connection_string,
            event_hub_name.to_string(),
            EventHubProducerClientOptions::default(),
        )
        .await?;
        Ok(Self { producer })
    }
}

pub struct EventHubsBatch {
    inner: azeventhubs::producer::EventDataBatch,
}

impl SinkBatch for EventHubsBatch {
    fn try_add(&mut self, serialized_event: &[u8]) -> Result<(), BatchAddError> {
        let event_data = EventData::from(serialized_event.to_vec());
        if self.inner.try_add_event_data(event_data, None) {
            Ok(())
        } else {
            Err(BatchAddError::Overflow)
        }
    }

    fn count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl Sink for EventHubsSink {
    type Batch = EventHubsBatch;

    /// Calls `GetEventHubProperties` once at service init (spec §6) — the
    /// partition list is fixed for the sink's lifetime.
    async fn partitions(&self) -> anyhow::Result<Vec<String>> {
        let properties = self.producer.get_event_hub_properties().await?;
        Ok(properties.partition_ids)
    }

    async fn new_batch(&self, partition_id: &str) -> anyhow::Result<Self::Batch> {
        let options = CreateBatchOptions {
            partition_id: Some(partition_id.to_string()),
            ..Default::default()
        };
        let inner = self.producer.create_batch(Some(options)).await?;
        Ok(EventHubsBatch { inner })
    }

    async fn send(&self, _partition_id: &str, batch: Self::Batch) -> anyhow::Result<()> {
        self.producer
            .send_event_batch(batch.inner, SendEventOptions::default())
            .await?;
        Ok(())
    }
}
