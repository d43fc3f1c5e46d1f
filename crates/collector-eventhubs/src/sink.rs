//! The polymorphic sink capability the partitioned dispatch engine depends
//! on (spec §6). The four real sinks — Event Hubs, MQTT, Dapr, OTel — share
//! no useful structure beyond "accept an event" (spec §9's design note);
//! only the Event-Hubs-style batching sink implements this trait, since
//! the other three bypass batching entirely and implement
//! [`collector_core::CollectorService`] directly.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum BatchAddError {
    /// Recoverable: the caller should seal the current batch, open a
    /// fresh one, and retry.
    #[error("event would overflow the sink's per-batch byte limit")]
    Overflow,
    /// Fatal: the worker that hit this aborts.
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

/// A batch under assembly for one partition.
pub trait SinkBatch: Send {
    fn try_add(&mut self, serialized_event: &[u8]) -> Result<(), BatchAddError>;
    fn count(&self) -> usize;
}

/// Capability the partitioned dispatch engine needs from a downstream
/// partitioned event-stream backend. `partitions()` is called once at
/// service init; everything else is called from producer workers, one
/// worker at a time per batch (batches are never shared across tasks).
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    type Batch: SinkBatch;

    /// The sink's partition list, fixed for the service's lifetime.
    async fn partitions(&self) -> anyhow::Result<Vec<String>>;

    async fn new_batch(&self, partition_id: &str) -> anyhow::Result<Self::Batch>;

    /// Must be safe to call concurrently from many producer workers
    /// across different partitions (spec §5) — implementations typically
    /// wrap a single shared network client.
    async fn send(&self, partition_id: &str, batch: Self::Batch) -> anyhow::Result<()>;
}

#[cfg(test)]
pub mod test_util {
    //! An in-process [`Sink`] used by this crate's own tests and by
    //! downstream integration tests that don't want a live Event Hubs
    //! namespace.

    use super::*;
    use std::sync::{Arc, Mutex};

    pub struct RecordingBatch {
        events: Vec<Vec<u8>>,
        size: usize,
        byte_limit: usize,
    }

    impl SinkBatch for RecordingBatch {
        fn try_add(&mut self, serialized_event: &[u8]) -> Result<(), BatchAddError> {
            if self.size + serialized_event.len() > self.byte_limit {
                return Err(BatchAddError::Overflow);
            }
            self.size += serialized_event.len();
            self.events.push(serialized_event.to_vec());
            Ok(())
        }

        fn count(&self) -> usize {
            self.events.len()
        }
    }

    #[derive(Clone)]
    pub struct SentBatch {
        pub partition_id: String,
        pub events: Vec<Vec<u8>>,
    }

    /// Records every batch it is sent and every partition it is asked to
    /// create batches for, for assertion by test code.
    pub struct RecordingSink {
        partitions: Vec<String>,
        byte_limit: usize,
        pub sent: Arc<Mutex<Vec<SentBatch>>>,
    }

    impl RecordingSink {
        pub fn new(partitions: Vec<String>, byte_limit: usize) -> Self {
            Self {
                partitions,
                byte_limit,
                sent: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn sent_batches(&self) -> Vec<SentBatch> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sink for RecordingSink {
        type Batch = RecordingBatch;

        async fn partitions(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.partitions.clone())
        }

        async fn new_batch(&self, _partition_id: &str) -> anyhow::Result<Self::Batch> {
            Ok(RecordingBatch {
                events: Vec::new(),
                size: 0,
                byte_limit: self.byte_limit,
            })
        }

        async fn send(&self, partition_id: &str, batch: Self::Batch) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(SentBatch {
                partition_id: partition_id.to_string(),
                events: batch.events,
            });
            Ok(())
        }
    }
}
