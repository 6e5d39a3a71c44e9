//! sdv-app - Vehicle signal access demo
//!
//! Runs the vehicle app against the in-memory databroker: connects all
//! clients, reads, writes and subscribes to `Vehicle.Speed` through the
//! selected protocol, drives the door and simulates a speed provider until
//! Ctrl-C.
//!
//! Usage:
//!   sdv-app [--config vehicle-app.toml] [--protocol v1|v2|model] [--speed 50]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sdv_app::{demo, logging, AppConfig, ConnectOutcome, VehicleApp};
use sdv_broker::{BrokerProtocol, MockDataBroker, ServiceConnection};
use sdv_core::{create_middleware, ProcessEnvironment};
use tokio_util::sync::CancellationToken;

const DEMO_VEHICLE_SERVICE: &str = "grpc://localhost:50051";

#[derive(Parser, Debug)]
#[command(name = "sdv-app", version, about = "Vehicle signal access demo")]
struct Args {
    /// App config file (TOML)
    #[arg(short, long, env = "SDV_APP_CONFIG")]
    config: Option<PathBuf>,

    /// Protocol used for signal access; overrides the config
    #[arg(short, long)]
    protocol: Option<BrokerProtocol>,

    /// Speed written to the broker at startup
    #[arg(short, long, default_value_t = 50.0)]
    speed: f32,

    /// Log JSON lines
    #[arg(long)]
    log_json: bool,
}

/// Defaults plus a door service location, which has no built-in fallback
fn demo_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.vehicle_service.address = Some(DEMO_VEHICLE_SERVICE.to_string());
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => demo_config(),
    };
    config.logging.json |= args.log_json;
    logging::init_tracing(&config.logging)?;

    match &args.config {
        Some(path) => tracing::info!("Loaded config from {}", path.display()),
        None => tracing::info!("No config file provided, using demo defaults"),
    }

    let middleware = create_middleware(ProcessEnvironment)?;
    let broker = MockDataBroker::new().with_speed(0.0);
    let app = VehicleApp::new(&config, middleware, Arc::new(broker.clone()))?;

    app.start();
    for report in app.join().await {
        if report.outcome != ConnectOutcome::Connected {
            tracing::warn!(client = report.client, outcome = ?report.outcome, "Client unavailable");
        }
    }

    let speed = args.speed;
    let protocol = args.protocol.unwrap_or(config.databroker.protocol);
    let client = app.broker(protocol);
    tracing::info!(%protocol, client = client.name(), "Using signal broker client");

    let cancel = CancellationToken::new();
    let subscription = {
        let client = client.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { demo::exercise_broker(client.as_ref(), speed, cancel).await })
    };
    if let Err(e) = demo::exercise_door(app.vehicle_service()).await {
        tracing::error!(error = %e, "Door sequence failed");
    }

    let provider = {
        let cancel = cancel.clone();
        let start = speed;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            let mut speed = start;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        speed = (speed + 5.0) % 130.0;
                        broker.publish_speed(speed);
                    }
                }
            }
        })
    };

    tracing::info!("Press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Waiting for Ctrl-C failed");
    }

    cancel.cancel();
    let _ = provider.await;
    match subscription.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "Speed access failed"),
        Err(e) => tracing::warn!(error = %e, "Speed task did not finish"),
    }
    app.stop().await;

    Ok(())
}
