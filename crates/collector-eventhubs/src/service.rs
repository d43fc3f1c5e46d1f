//! [`CollectorService`] implementation for the partitioned Event-Hubs-style
//! sink: routes each report's identity to a stable partition and offers
//! one [`Event`] per report onto that partition's queue.

use crate::queue::PartitionQueue;
use crate::Event;
use async_trait::async_trait;
use collector_core::report::Report;
use collector_core::router;
use collector_core::service::{CollectorError, CollectorService};
use collector_core::DeviceIdentity;
use tokio_util::sync::CancellationToken;

/// Whether `collect` blocks for queue room or fails fast (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Blocking,
    NonBlocking,
}

pub struct EventHubsCollectorService {
    queues: Vec<PartitionQueue>,
    admission: Admission,
}

impl EventHubsCollectorService {
    /// `queues` must be indexed by partition id 0..partitions.len() in
    /// order — [`collector_core::router::route`] returns `Some` index into
    /// this slice, or `None` (handled as a no-op by `collect`) when
    /// `queues` is empty.
    pub fn new(queues: Vec<PartitionQueue>, admission: Admission) -> Self {
        Self { queues, admission }
    }

    pub fn queues(&self) -> &[PartitionQueue] {
        &self.queues
    }
}

#[async_trait]
impl CollectorService for EventHubsCollectorService {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        identity: &DeviceIdentity,
        reports: Vec<Report>,
    ) -> Result<(), CollectorError> {
        // An empty partition list is a real condition the sink can report
        // (e.g. transiently, during discovery) rather than invalid input —
        // mirrors the original's `enqueue()`, which no-ops rather than
        // faulting when it has no partition queues to route into.
        let Some(partition_index) = router::route(identity, self.queues.len()) else {
            tracing::warn!("no partitions available, dropping {} report(s)", reports.len());
            return Ok(());
        };
        let queue = &self.queues[partition_index];

        for report in reports {
            let event = Event::from_report(identity, report);
            match self.admission {
                Admission::Blocking => queue.offer(event, cancel).await?,
                Admission::NonBlocking => queue.try_offer(event)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_report(minute: i64) -> Report {
        Report {
            collection_time: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap()
                + chrono::Duration::minutes(minute),
            parameters: Default::default(),
        }
    }

    #[tokio::test]
    async fn same_identity_always_lands_on_same_partition() {
        let queues: Vec<PartitionQueue> = (0..4).map(|i| PartitionQueue::new(i.to_string(), 16)).collect();
        let service = EventHubsCollectorService::new(queues, Admission::NonBlocking);
        let cancel = CancellationToken::new();
        let identity = DeviceIdentity::new("ACME", "RT", "1");

        service
            .collect(&cancel, &identity, vec![test_report(0), test_report(1)])
            .await
            .unwrap();

        let lens: Vec<usize> = service.queues().iter().map(|q| q.receiver().len()).collect();
        assert_eq!(lens.iter().sum::<usize>(), 2);
        assert_eq!(lens.iter().filter(|&&n| n > 0).count(), 1);
    }

    #[tokio::test]
    async fn non_blocking_admission_surfaces_backpressure() {
        let queues = vec![PartitionQueue::new("0", 1)];
        let service = EventHubsCollectorService::new(queues, Admission::NonBlocking);
        let cancel = CancellationToken::new();
        let identity = DeviceIdentity::new("ACME", "RT", "1");

        let result = service
            .collect(&cancel, &identity, vec![test_report(0), test_report(1)])
            .await;

        assert!(matches!(result, Err(CollectorError::Backpressure)));
    }

    #[tokio::test]
    async fn empty_partition_list_is_a_no_op_not_a_panic() {
        let service = EventHubsCollectorService::new(Vec::new(), Admission::NonBlocking);
        let cancel = CancellationToken::new();
        let identity = DeviceIdentity::new("ACME", "RT", "1");

        let result = service.collect(&cancel, &identity, vec![test_report(0)]).await;
        assert!(result.is_ok());
    }
}
