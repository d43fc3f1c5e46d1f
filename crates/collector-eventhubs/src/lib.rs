//! # collector-eventhubs - Partitioned Dispatch Engine
//!
//! This crate is the hard engineering referenced by the system
//! specification: it sits between the HTTP ingress façade
//! ([`collector_core::http`]) and an Event Hubs-style partitioned sink. It
//! routes each normalized report to a stable partition, buffers it in a
//! bounded per-partition queue, and runs a fixed pool of producer workers
//! per partition that assemble size-bounded batches and flush them on
//! time, on overflow, or on shutdown.
//!
//! ## Flow
//!
//! 1. [`service::EventHubsCollectorService::collect`] routes each report
//!    to a partition ([`collector_core::router::route`]) and offers it to
//!    that partition's [`queue::PartitionQueue`].
//! 2. [`producer::run_producer`] drains the queue, assembling
//!    [`sink::SinkBatch`]es via the pluggable [`sink::Sink`] capability.
//! 3. [`supervisor::Supervisor::run`] owns the producer pool for the
//!    lifetime of the process and aggregates their outcomes into a
//!    [`supervisor::RunError`].

pub mod event;
pub mod producer;
pub mod queue;
pub mod service;
pub mod sink;
pub mod sink_eventhubs;
pub mod supervisor;

pub use event::Event;
pub use service::EventHubsCollectorService;
pub use sink::{Sink, SinkBatch};
pub use supervisor::{RunError, Supervisor};
