//! Command-line entry point for the Skywatch ingestion worker.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use skywatch_core::config::{MqttConfig, RefreshConfig, StorageConfig};
use skywatch_ingest::{
    spawn_refresh_loop, Evaluator, EvaluatorPool, IngestionService, MqttWorker, ThresholdCache,
};
use skywatch_storage::{open_database, RedbAlertStore, RedbReadingStore, RedbSensorStore};

/// Skywatch - field sensor telemetry ingestion and threshold alerting.
#[derive(Parser, Debug)]
#[command(name = "skywatch")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MQTT broker host.
    #[arg(long, default_value = "localhost")]
    broker: String,

    /// MQTT broker port.
    #[arg(short, long, default_value_t = 1883)]
    port: u16,

    /// MQTT client ID; generated when unset.
    #[arg(long)]
    client_id: Option<String>,

    /// Username for broker authentication.
    #[arg(long)]
    username: Option<String>,

    /// Password for broker authentication.
    #[arg(long)]
    password: Option<String>,

    /// Path to the database file.
    #[arg(long, default_value = "data/skywatch.redb")]
    db: PathBuf,

    /// Seconds between full threshold refreshes.
    #[arg(long, default_value_t = 300)]
    refresh_interval: u64,

    /// Number of threshold evaluation workers.
    #[arg(long, default_value_t = 4)]
    eval_workers: usize,

    /// Capacity of the evaluation queue.
    #[arg(long, default_value_t = 256)]
    eval_queue: usize,

    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "skywatch=debug"
    } else {
        "skywatch=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if args.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting Skywatch ingestion worker");

    let storage = StorageConfig {
        path: args.db.clone(),
    };
    let refresh = RefreshConfig {
        interval_secs: args.refresh_interval,
    };

    let db = open_database(&storage.path)?;
    let readings = Arc::new(RedbReadingStore::new(db.clone()));
    let sensors = Arc::new(RedbSensorStore::new(db.clone()));
    let alerts = Arc::new(RedbAlertStore::new(db));

    let cache = Arc::new(ThresholdCache::new(sensors));
    // A failed boot refresh is not fatal: the cache lazy-fills per sensor
    // and the periodic loop retries.
    if let Err(e) = cache.refresh_all().await {
        error!("Initial threshold refresh failed: {}", e);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let refresh_task = spawn_refresh_loop(cache.clone(), refresh.interval(), shutdown_rx.clone());

    let pool = EvaluatorPool::spawn(
        Evaluator::new(cache, alerts),
        args.eval_workers,
        args.eval_queue,
        shutdown_rx.clone(),
    );
    let service = Arc::new(IngestionService::new(readings, pool));

    let worker = MqttWorker::new(
        MqttConfig {
            broker: args.broker,
            port: args.port,
            client_id: args.client_id,
            username: args.username,
            password: args.password,
            ..Default::default()
        },
        service,
    );
    let session = worker.start(shutdown_rx)?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    // Disconnect the transport first, then cancel the background loops.
    // In-flight evaluations are best-effort and not awaited.
    session.stop().await;
    let _ = shutdown_tx.send(true);
    let _ = refresh_task.await;

    info!("Worker stopped");
    Ok(())
}
