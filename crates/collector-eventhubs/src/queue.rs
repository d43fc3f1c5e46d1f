//! Bounded per-partition FIFO queues — the backpressure primitive.
//!
//! Built on `async_channel` rather than `tokio::sync::mpsc`: an `mpsc`
//! channel has exactly one receiver, but spec §4.5 requires each of a
//! partition's `PartitionProducersCount` workers to drain the same queue
//! independently, each assembling its own batch. `async_channel`'s
//! multi-producer/multi-consumer semantics give every producer worker its
//! own cloned `Receiver` over the same bounded buffer — do not replace
//! this with an unbounded channel or a lock-protected `Vec`; the
//! boundedness is the admission-control mechanism (spec §9).

use collector_core::service::CollectorError;
use tokio_util::sync::CancellationToken;

/// One partition's bounded event buffer, shared by every HTTP handler
/// (producers) and every producer worker for that partition (consumers).
#[derive(Clone)]
pub struct PartitionQueue {
    pub partition_id: String,
    tx: async_channel::Sender<crate::Event>,
    rx: async_channel::Receiver<crate::Event>,
}

impl PartitionQueue {
    pub fn new(partition_id: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity);
        Self {
            partition_id: partition_id.into(),
            tx,
            rx,
        }
    }

    /// A fresh handle onto the same underlying buffer, for a producer
    /// worker to drain independently of its siblings.
    pub fn receiver(&self) -> async_channel::Receiver<crate::Event> {
        self.rx.clone()
    }

    /// Blocking offer — the backpressure point. Awaits room in the queue
    /// or cancellation, whichever comes first.
    pub async fn offer(&self, event: crate::Event, cancel: &CancellationToken) -> Result<(), CollectorError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectorError::Cancelled),
            result = self.tx.send(event) => {
                result.map_err(|_| CollectorError::Cancelled)?;
                metrics::gauge!("partition_queue_counter", "partition" => self.partition_id.clone()).increment(1.0);
                Ok(())
            }
        }
    }

    /// Non-blocking offer. Returns [`CollectorError::Backpressure`] when
    /// the queue is full, translated by the HTTP layer into `429`.
    pub fn try_offer(&self, event: crate::Event) -> Result<(), CollectorError> {
        match self.tx.try_send(event) {
            Ok(()) => {
                metrics::gauge!("partition_queue_counter", "partition" => self.partition_id.clone()).increment(1.0);
                Ok(())
            }
            Err(async_channel::TrySendError::Full(_)) => Err(CollectorError::Backpressure),
            Err(async_channel::TrySendError::Closed(_)) => Err(CollectorError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocking_offer_succeeds_under_capacity() {
        let queue = PartitionQueue::new("0", 4);
        let cancel = CancellationToken::new();
        let event = test_event();
        queue.offer(event, &cancel).await.unwrap();
        assert_eq!(queue.receiver().len(), 1);
    }

    #[test]
    fn non_blocking_offer_rejects_when_full() {
        let queue = PartitionQueue::new("0", 1);
        queue.try_offer(test_event()).unwrap();
        assert!(matches!(
            queue.try_offer(test_event()),
            Err(CollectorError::Backpressure)
        ));
    }

    fn test_event() -> crate::Event {
        crate::Event {
            collection_time: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            oui: "ACME".into(),
            product_class: "RT".into(),
            serial_number: "1".into(),
            parameters: Default::default(),
        }
    }
}
