//! Server binary wiring the partitioned dispatch engine to a live Event
//! Hubs namespace. Mirrors the reference `cmd/azureeventhubs` entry point:
//! build the sink, discover its partitions, stand up one bounded queue per
//! partition, spawn the producer pool, and serve HTTP ingress until
//! shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use collector_core::config::CollectorConfig;
use collector_core::http::{self, AppState};
use collector_core::service::CollectorService;
use collector_eventhubs::queue::PartitionQueue;
use collector_eventhubs::service::{Admission, EventHubsCollectorService};
use collector_eventhubs::sink::Sink;
use collector_eventhubs::sink_eventhubs::EventHubsSink;
use collector_eventhubs::Supervisor;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "collector-eventhubs")]
#[command(about = "TR-069/TR-369 bulk-data collector, dispatching to Azure Event Hubs")]
struct Args {
    /// Event Hubs namespace connection string.
    #[arg(long, env = "EVENTHUB_CONNECTION_STRING")]
    connection_string: String,

    /// Event Hub (entity) name.
    #[arg(long, env = "EVENTHUB_NAME")]
    event_hub_name: String,

    /// Address to bind the HTTP ingress/metrics server on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen_addr: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let collector_config = CollectorConfig::from_env().context("loading collector configuration")?;

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let sink = EventHubsSink::connect(&args.connection_string, &args.event_hub_name)
        .await
        .context("connecting to Event Hubs")?;
    let partitions = sink.partitions().await.context("listing Event Hubs partitions")?;
    tracing::info!(partition_count = partitions.len(), "discovered event hub partitions");

    let queues: Vec<PartitionQueue> = partitions
        .iter()
        .map(|partition_id| PartitionQueue::new(partition_id.clone(), collector_config.partition_queue_limit))
        .collect();

    let service: Arc<dyn CollectorService> = Arc::new(EventHubsCollectorService::new(
        queues.clone(),
        Admission::Blocking,
    ));

    let cancel = CancellationToken::new();
    let supervisor = Supervisor::new(Arc::new(sink), queues, collector_config.partition_producers_count);

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

    let supervisor_cancel = cancel.clone();
    let supervisor_handle = tokio::spawn(async move { supervisor.run(supervisor_cancel).await });

    let server_cancel = cancel.clone();
    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("http server exited")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
            server_cancel.cancel();
        }
    }

    cancel.cancel();
    match supervisor_handle.await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(run_err)) => {
            tracing::error!(error = %run_err, "producer pool exited with errors");
            Err(run_err).context("producer pool run failed")
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "supervisor task panicked");
            Err(join_err).context("supervisor task panicked")
        }
    }
}
