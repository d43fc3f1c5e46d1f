//! Server binary mapping device parameters onto OpenTelemetry instruments.
//! Mirrors the reference `cmd/otel` entry point: a JSON config file names
//! the meter and its instruments; metric readings are exported over OTLP.
//! This sink has no partitioned batching stage and forwards nothing to a
//! downstream event stream — it only measures.

use anyhow::{Context, Result};
use clap::Parser;
use collector_core::http::{self, AppState};
use collector_core::service::CollectorService;
use collector_otel::{InstrumentKind, InstrumentOptions, OtelCollectorService};
use metrics_exporter_prometheus::PrometheusBuilder;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "collector-otel")]
#[command(about = "TR-069/TR-369 bulk-data collector, mapping parameters onto OpenTelemetry instruments")]
struct Args {
    /// Path to a JSON file listing the meter's instruments.
    #[arg(long, env = "OTEL_INSTRUMENTS_CONFIG")]
    instruments_config: PathBuf,

    #[arg(long, env = "OTEL_METER_NAME", default_value = "collector")]
    meter_name: String,

    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT", default_value = "http://localhost:4318")]
    otlp_endpoint: String,

    #[arg(long, default_value = "0.0.0.0:8088")]
    listen_addr: String,
}

#[derive(Debug, Deserialize)]
struct InstrumentConfig {
    #[serde(rename = "ParameterName")]
    parameter_name: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Kind")]
    kind: String,
    #[serde(default, rename = "Description")]
    description: String,
    #[serde(default, rename = "Unit")]
    unit: String,
}

#[derive(Debug, Deserialize)]
struct InstrumentsFile {
    #[serde(rename = "Instruments")]
    instruments: Vec<InstrumentConfig>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let raw = std::fs::read_to_string(&args.instruments_config)
        .with_context(|| format!("reading {}", args.instruments_config.display()))?;
    let instruments_file: InstrumentsFile =
        serde_json::from_str(&raw).context("parsing instruments config")?;

    let instrument_options = instruments_file
        .instruments
        .into_iter()
        .map(|c| {
            Ok(InstrumentOptions {
                parameter_name: c.parameter_name,
                name: c.name,
                kind: InstrumentKind::parse(&c.kind)?,
                description: c.description,
                unit: c.unit,
            })
        })
        .collect::<Result<Vec<_>, collector_otel::instrument::InstrumentError>>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(&args.otlp_endpoint)
        .build_metrics_exporter(
            opentelemetry_sdk::metrics::reader::DefaultTemporalitySelector::new().into(),
            opentelemetry_sdk::metrics::reader::DefaultAggregationSelector::new().into(),
        )
        .context("building OTLP metrics exporter")?;
    let reader = PeriodicReader::builder(exporter, opentelemetry_sdk::runtime::Tokio).build();
    let meter_provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = meter_provider.meter(args.meter_name.clone());

    let service: Arc<dyn CollectorService> =
        Arc::new(OtelCollectorService::new(&meter, &instrument_options));
    let cancel = CancellationToken::new();

    let state = AppState {
        service,
        cancel: cancel.clone(),
        metrics_handle,
    };
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("binding {}", args.listen_addr))?;
    tracing::info!(addr = %args.listen_addr, "listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("http server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            cancel.cancel();
        }
    }

    meter_provider.shutdown().context("shutting down meter provider")?;
    Ok(())
}
