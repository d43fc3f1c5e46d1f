//! Server binary wiring the ingress façade directly to an MQTT broker.
//! Mirrors the reference `cmd/mqtt` entry point: this sink has no
//! partitioned batching stage — every report is published as it arrives.

use anyhow::{Context, Result};
use clap::Parser;
use collector_core::http::{self, AppState};
use collector_core::service::CollectorService;
use collector_mqtt::MqttCollectorService;
use metrics_exporter_prometheus::PrometheusBuilder;
use rumqttc::{AsyncClient, MqttOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "collector-mqtt")]
#[command(about = "TR-069/TR-369 bulk-data collector, publishing to an MQTT broker")]
struct Args {
    #[arg(long, env = "MQTT_BROKER_HOST")]
    broker_host: String,

    #[arg(long, env = "MQTT_BROKER_PORT", default_value_t = 1883)]
    broker_port: u16,

    #[arg(long, env = "MQTT_CLIENT_ID", default_value = "bulk-data-collector")]
    client_id: String,

    /// The `collector_name` segment of the published topic.
    #[arg(long, env = "MQTT_COLLECTOR_NAME", default_value = "100000")]
    collector_name: String,

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

    let mut mqtt_options = MqttOptions::new(&args.client_id, &args.broker_host, args.broker_port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    let (client, mut event_loop) = AsyncClient::new(mqtt_options, 100);

    tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(event) => tracing::trace!(?event, "mqtt event"),
                Err(err) => {
                    tracing::error!(error = %err, "mqtt connection error");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    let service: Arc<dyn CollectorService> =
        Arc::new(MqttCollectorService::new(client, args.collector_name));
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
