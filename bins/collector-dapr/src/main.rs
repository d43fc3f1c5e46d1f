//! Server binary wiring the ingress façade directly to a Dapr pub/sub
//! component via the local Dapr sidecar. Mirrors the reference `cmd/dapr`
//! entry point: this sink has no partitioned batching stage.

use anyhow::{Context, Result};
use clap::Parser;
use collector_core::http::{self, AppState};
use collector_core::service::CollectorService;
use collector_dapr::DaprCollectorService;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "collector-dapr")]
#[command(about = "TR-069/TR-369 bulk-data collector, publishing via the Dapr pub/sub sidecar")]
struct Args {
    #[arg(long, env = "DAPR_HTTP_ENDPOINT", default_value = "http://localhost:3500")]
    sidecar_base_url: String,

    #[arg(long, env = "DAPR_PUBSUB_NAME", default_value = "bulk-data-pubsub")]
    pubsub_name: String,

    #[arg(long, env = "DAPR_TOPIC_PREFIX", default_value = "collector")]
    topic_prefix: String,

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

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .context("building Dapr sidecar HTTP client")?;

    let service: Arc<dyn CollectorService> = Arc::new(DaprCollectorService::new(
        http_client,
        args.sidecar_base_url,
        args.pubsub_name,
        args.topic_prefix,
    ));
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

    Ok(())
}
