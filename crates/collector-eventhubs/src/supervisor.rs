//! The run supervisor — owns the producer pool for the service's
//! lifetime, joins every worker, and aggregates failures.
//!
//! ```text
//! INIT -> RUNNING   : run() called
//! RUNNING -> DRAINING : cancel signaled
//! DRAINING -> STOPPED : all workers returned
//! INIT -> STOPPED   : run() never called (trivial)
//! ```
//!
//! Ingress `collect` calls made before `RUNNING` are accepted — the
//! queues already exist — but block on `offer` until a producer starts.
//! After `STOPPED`, `offer` returns `Cancelled`.

use crate::producer::{self, ProducerError};
use crate::queue::PartitionQueue;
use crate::sink::Sink;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Every child producer error, concatenated newline-separated in
/// `Display`. Built with `Vec::with_capacity` up front and only ever
/// pushed into — the original's `make([]string, len(errs))` followed by
/// `append` produces leading empty strings; this port does not reproduce
/// that bug (see DESIGN.md).
#[derive(Debug)]
pub struct RunError {
    pub producer_errors: Vec<ProducerError>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.producer_errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("\n"))
    }
}

impl std::error::Error for RunError {}

/// Spawns `partitions.len() * producers_per_partition` producer tasks and
/// joins them all.
pub struct Supervisor<S: Sink> {
    sink: Arc<S>,
    queues: Vec<PartitionQueue>,
    producers_per_partition: usize,
}

impl<S: Sink> Supervisor<S> {
    pub fn new(sink: Arc<S>, queues: Vec<PartitionQueue>, producers_per_partition: usize) -> Self {
        let producers_per_partition = producers_per_partition.max(1);
        Self {
            sink,
            queues,
            producers_per_partition,
        }
    }

    /// Runs every producer worker to completion. Returns `Ok(())` if every
    /// worker finished cleanly, `Err(RunError)` if any did not.
    /// Cancelling `cancel` drives every worker to flush-and-exit.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RunError> {
        let mut handles = Vec::with_capacity(self.queues.len() * self.producers_per_partition);

        for queue in &self.queues {
            for _ in 0..self.producers_per_partition {
                let sink = Arc::clone(&self.sink);
                let partition_id = queue.partition_id.clone();
                let rx = queue.receiver();
                let cancel = cancel.clone();
                handles.push(tokio::spawn(producer::run_producer(sink, partition_id, rx, cancel)));
            }
        }

        let mut producer_errors = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => producer_errors.push(err),
                Err(join_err) => producer_errors.push(ProducerError::Sink {
                    partition_id: "unknown".to_string(),
                    source: anyhow::anyhow!("producer task panicked: {join_err}"),
                }),
            }
        }

        if producer_errors.is_empty() {
            Ok(())
        } else {
            Err(RunError { producer_errors })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_util::RecordingSink;
    use crate::Event;

    fn test_event(partition: &str) -> Event {
        Event {
            collection_time: chrono::DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            oui: "ACME".into(),
            product_class: "RT".into(),
            serial_number: partition.into(),
            parameters: Default::default(),
        }
    }

    #[tokio::test]
    async fn clean_shutdown_flushes_every_non_empty_batch() {
        let sink = Arc::new(RecordingSink::new(vec!["0".into(), "1".into()], 1_000_000));
        let queues = vec![PartitionQueue::new("0", 10), PartitionQueue::new("1", 10)];

        queues[0].try_offer(test_event("a")).unwrap();
        queues[1].try_offer(test_event("b")).unwrap();

        let supervisor = Supervisor::new(Arc::clone(&sink), queues, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        supervisor.run(cancel).await.unwrap();

        let sent = sink.sent_batches();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent.iter().map(|b| b.events.len()).sum::<usize>(), 2);
    }

    #[tokio::test]
    async fn one_partition_failing_does_not_affect_siblings() {
        // A byte_limit of 1 guarantees partition "0"'s only event is
        // oversize-fatal; partition "1" gets no event and exits cleanly.
        let sink = Arc::new(RecordingSink::new(vec!["0".into(), "1".into()], 1));
        let queues = vec![PartitionQueue::new("0", 10), PartitionQueue::new("1", 10)];

        queues[0].try_offer(test_event("a")).unwrap();

        let supervisor = Supervisor::new(Arc::clone(&sink), queues, 1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = supervisor.run(cancel).await;
        assert!(result.is_err());
        let run_err = result.unwrap_err();
        assert_eq!(run_err.producer_errors.len(), 1);
    }
}
