//! Per-parameter metric instruments: each configured parameter name maps
//! to exactly one OpenTelemetry instrument of a declared kind. Unconfigured
//! parameter names are silently dropped rather than erroring, matching
//! the reference sink's `ok` map lookup.
//!
//! Gauges are the one kind that doesn't map onto a synchronous `opentelemetry`
//! 0.21 instrument (that release only ships asynchronous, callback-driven
//! `ObservableGauge`s — synchronous gauges landed materially later); see
//! [`GaugeState`] for how `measure()`'s per-event push is bridged onto that
//! pull-based callback.

use collector_core::report::EventValue;
use opentelemetry::metrics::Meter;
use opentelemetry::KeyValue;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error("invalid instrument kind: {0}")]
    InvalidKind(String),
    #[error("value {0:?} cannot be measured as a number")]
    InvalidValueType(EventValue),
}

/// Mirrors the reference sink's `OTelInstrumentKind*` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Int64Counter,
    Int64Gauge,
    Int64Histogram,
    Int64UpDownCounter,
    Float64Counter,
    Float64Gauge,
    Float64Histogram,
    Float64UpDownCounter,
}

impl InstrumentKind {
    pub fn parse(name: &str) -> Result<Self, InstrumentError> {
        match name {
            "Int64Counter" => Ok(Self::Int64Counter),
            "Int64Gauge" => Ok(Self::Int64Gauge),
            "Int64Histogram" => Ok(Self::Int64Histogram),
            "Int64UpDownCounter" => Ok(Self::Int64UpDownCounter),
            "Float64Counter" => Ok(Self::Float64Counter),
            "Float64Gauge" => Ok(Self::Float64Gauge),
            "Float64Histogram" => Ok(Self::Float64Histogram),
            "Float64UpDownCounter" => Ok(Self::Float64UpDownCounter),
            other => Err(InstrumentError::InvalidKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    pub parameter_name: String,
    pub name: String,
    pub kind: InstrumentKind,
    pub description: String,
    pub unit: String,
}

fn to_i64(value: &EventValue) -> Result<i64, InstrumentError> {
    match value {
        EventValue::Typed(p) => match p {
            collector_core::parameter::ParameterValue::I32(v) => Ok(*v as i64),
            collector_core::parameter::ParameterValue::I64(v) => Ok(*v),
            collector_core::parameter::ParameterValue::U32(v) => Ok(*v as i64),
            collector_core::parameter::ParameterValue::U64(v) => Ok(*v as i64),
            collector_core::parameter::ParameterValue::Bool(b) => Ok(if *b { 1 } else { 0 }),
            collector_core::parameter::ParameterValue::String(s) => {
                s.parse().map_err(|_| InstrumentError::InvalidValueType(value.clone()))
            }
            _ => Err(InstrumentError::InvalidValueType(value.clone())),
        },
        EventValue::Json(json) => json
            .as_i64()
            .or_else(|| json.as_f64().map(|f| f as i64))
            .or_else(|| json.as_bool().map(|b| if b { 1 } else { 0 }))
            .ok_or_else(|| InstrumentError::InvalidValueType(value.clone())),
    }
}

fn to_f64(value: &EventValue) -> Result<f64, InstrumentError> {
    match value {
        EventValue::Typed(p) => match p {
            collector_core::parameter::ParameterValue::I32(v) => Ok(*v as f64),
            collector_core::parameter::ParameterValue::I64(v) => Ok(*v as f64),
            collector_core::parameter::ParameterValue::U32(v) => Ok(*v as f64),
            collector_core::parameter::ParameterValue::U64(v) => Ok(*v as f64),
            collector_core::parameter::ParameterValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            collector_core::parameter::ParameterValue::String(s) => {
                s.parse().map_err(|_| InstrumentError::InvalidValueType(value.clone()))
            }
            _ => Err(InstrumentError::InvalidValueType(value.clone())),
        },
        EventValue::Json(json) => json
            .as_f64()
            .or_else(|| json.as_bool().map(|b| if b { 1.0 } else { 0.0 }))
            .ok_or_else(|| InstrumentError::InvalidValueType(value.clone())),
    }
}

/// Backing state for a gauge mapped onto an [`opentelemetry::metrics::ObservableGauge`].
///
/// The `opentelemetry` 0.21 line pinned by this workspace only exposes
/// gauges as asynchronous, callback-driven instruments — there is no
/// synchronous `Meter::i64_gauge`/`Gauge<T>::record` in this release. To
/// still support `measure()` being called imperatively, once per event,
/// the last observed value (and the attributes it was recorded with) are
/// stashed behind a mutex; the registered callback reports whatever is
/// there whenever the SDK's periodic reader collects.
struct GaugeState<T> {
    _handle: opentelemetry::metrics::ObservableGauge<T>,
    last: Arc<Mutex<Option<(T, Vec<KeyValue>)>>>,
}

pub enum Instrument {
    Int64Counter(opentelemetry::metrics::Counter<u64>),
    Int64Gauge(GaugeState<i64>),
    Int64Histogram(opentelemetry::metrics::Histogram<u64>),
    Int64UpDownCounter(opentelemetry::metrics::UpDownCounter<i64>),
    Float64Counter(opentelemetry::metrics::Counter<f64>),
    Float64Gauge(GaugeState<f64>),
    Float64Histogram(opentelemetry::metrics::Histogram<f64>),
    Float64UpDownCounter(opentelemetry::metrics::UpDownCounter<f64>),
}

impl Instrument {
    pub fn new(meter: &Meter, options: &InstrumentOptions) -> Self {
        match options.kind {
            InstrumentKind::Int64Counter => Instrument::Int64Counter(
                meter
                    .u64_counter(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
            InstrumentKind::Int64Gauge => {
                let last: Arc<Mutex<Option<(i64, Vec<KeyValue>)>>> = Arc::new(Mutex::new(None));
                let callback_last = Arc::clone(&last);
                let handle = meter
                    .i64_observable_gauge(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .with_callback(move |observer| {
                        if let Some((value, attributes)) = callback_last.lock().unwrap().clone() {
                            observer.observe(value, &attributes);
                        }
                    })
                    .init();
                Instrument::Int64Gauge(GaugeState { _handle: handle, last })
            }
            InstrumentKind::Int64Histogram => Instrument::Int64Histogram(
                meter
                    .u64_histogram(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
            InstrumentKind::Int64UpDownCounter => Instrument::Int64UpDownCounter(
                meter
                    .i64_up_down_counter(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
            InstrumentKind::Float64Counter => Instrument::Float64Counter(
                meter
                    .f64_counter(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
            InstrumentKind::Float64Gauge => {
                let last: Arc<Mutex<Option<(f64, Vec<KeyValue>)>>> = Arc::new(Mutex::new(None));
                let callback_last = Arc::clone(&last);
                let handle = meter
                    .f64_observable_gauge(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .with_callback(move |observer| {
                        if let Some((value, attributes)) = callback_last.lock().unwrap().clone() {
                            observer.observe(value, &attributes);
                        }
                    })
                    .init();
                Instrument::Float64Gauge(GaugeState { _handle: handle, last })
            }
            InstrumentKind::Float64Histogram => Instrument::Float64Histogram(
                meter
                    .f64_histogram(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
            InstrumentKind::Float64UpDownCounter => Instrument::Float64UpDownCounter(
                meter
                    .f64_up_down_counter(options.name.clone())
                    .with_description(options.description.clone())
                    .with_unit(options.unit.clone())
                    .init(),
            ),
        }
    }

    pub fn measure(&self, value: &EventValue, attributes: &[KeyValue]) -> Result<(), InstrumentError> {
        match self {
            Instrument::Int64Counter(c) => c.add(to_i64(value)?.max(0) as u64, attributes),
            Instrument::Int64Gauge(g) => {
                *g.last.lock().unwrap() = Some((to_i64(value)?, attributes.to_vec()));
            }
            Instrument::Int64Histogram(h) => h.record(to_i64(value)?.max(0) as u64, attributes),
            Instrument::Int64UpDownCounter(u) => u.add(to_i64(value)?, attributes),
            Instrument::Float64Counter(c) => c.add(to_f64(value)?, attributes),
            Instrument::Float64Gauge(g) => {
                *g.last.lock().unwrap() = Some((to_f64(value)?, attributes.to_vec()));
            }
            Instrument::Float64Histogram(h) => h.record(to_f64(value)?, attributes),
            Instrument::Float64UpDownCounter(u) => u.add(to_f64(value)?, attributes),
        }
        Ok(())
    }
}
