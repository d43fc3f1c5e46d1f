//! # collector-core - Shared Types and Ingress Contracts
//!
//! This crate provides the types and traits shared by every bulk-data
//! collector sink: the TR-106 parameter codec, the report normalizer that
//! turns a wire payload into a sequence of [`Event`]-shaped [`Report`]s, the
//! partition router, and the [`CollectorService`] trait that the HTTP
//! ingress façade drives.
//!
//! ## Key Components
//!
//! - **Parameter codec** ([`parameter`]): parses TR-106 textual parameter
//!   values into typed runtime values.
//! - **Report normalizer** ([`report`]): decodes ParameterPerRow CSV and
//!   NameValuePair JSON bulk-data payloads into [`Report`]s.
//! - **Partition router** ([`router`]): maps a [`DeviceIdentity`] to a
//!   stable partition index.
//! - **Ingress façade** ([`service`]): the [`CollectorService`] trait every
//!   sink implements, and the error/status-code mapping the HTTP layer
//!   uses.
//! - **HTTP wiring** ([`http`]): the `axum` router shared by every sink
//!   binary.
//! - **Configuration** ([`config`]): environment-backed collector
//!   configuration, prefix `BULK_DATA_COLLECTOR_`.

pub mod config;
pub mod http;
pub mod identity;
pub mod parameter;
pub mod report;
pub mod router;
pub mod service;

pub use identity::DeviceIdentity;
pub use parameter::{ParameterError, ParameterValue};
pub use report::{NormalizeError, Report};
pub use router::route;
pub use service::{CollectorError, CollectorService};
