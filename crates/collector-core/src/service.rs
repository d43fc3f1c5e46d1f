//! The ingress façade: the [`CollectorService`] trait every sink
//! implements, plus the CSV/JSON wrapper functions that normalize a wire
//! payload and then drive the trait's single `collect` entry point.
//!
//! The original exposes three entry points (`Collect`, `CollectCSV`,
//! `CollectJSON`); here only `collect` varies per sink (how an already-normalized
//! report is enqueued), so `collect_csv`/`collect_json` are free functions
//! that normalize and delegate, rather than further trait methods — this
//! avoids three near-identical implementations per sink.

use crate::identity::DeviceIdentity;
use crate::report::{self, NormalizeError, Report};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("backpressure: partition queue is full")]
    Backpressure,
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Behavior on partial failure (spec §4.7): if any report fails to
/// enqueue, the call returns immediately with that error. Reports already
/// enqueued earlier in the same call stay enqueued — there is no
/// per-call atomicity.
#[async_trait]
pub trait CollectorService: Send + Sync {
    /// Enqueues one event per already-normalized report for `identity`.
    async fn collect(
        &self,
        cancel: &CancellationToken,
        identity: &DeviceIdentity,
        reports: Vec<Report>,
    ) -> Result<(), CollectorError>;
}

/// Normalizes a ParameterPerRow CSV payload and offers each resulting
/// report to `service`.
pub async fn collect_csv(
    service: &dyn CollectorService,
    cancel: &CancellationToken,
    identity: &DeviceIdentity,
    body: &[u8],
) -> Result<(), CollectorError> {
    let reports = report::normalize_csv(body)?;
    service.collect(cancel, identity, reports).await
}

/// Normalizes a NameValuePair JSON payload and offers each resulting
/// report to `service`.
pub async fn collect_json(
    service: &dyn CollectorService,
    cancel: &CancellationToken,
    identity: &DeviceIdentity,
    body: &[u8],
) -> Result<(), CollectorError> {
    let reports = report::normalize_json(body)?;
    service.collect(cancel, identity, reports).await
}
