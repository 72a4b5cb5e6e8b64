use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meal_service::config::{LogFormat, LoggingConfig, ServiceConfig};
use meal_service::http::{AppState, HttpServer};
use meal_service::pipeline::RequestPipeline;
use meal_service::ratelimit::LimiterRegistry;
use meal_service::store::{remove_database, SqliteMealStore};
use meal_service::telemetry::Tracer;

#[derive(Parser, Debug)]
#[command(name = "meal-service", version, about = "Meal CRUD API with per-route rate limiting")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// Seed file used when the meals table is first created
    #[arg(long)]
    seed_file: Option<PathBuf>,

    /// Delete the database file before starting
    #[arg(long)]
    reset_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }
    if let Some(database) = cli.database {
        config.store.database_path = database;
    }
    if let Some(seed_file) = cli.seed_file {
        config.store.seed_file = seed_file;
    }

    init_logging(&config.logging);

    info!("Starting Meal Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(bind_addr = %config.server.bind_addr, "Configuration loaded");

    if cli.reset_db {
        remove_database(&config.store.database_path)?;
    }
    let store = SqliteMealStore::open(
        &config.store.database_path,
        Some(config.store.seed_file.as_path()),
    )?;

    let registry = Arc::new(LimiterRegistry::with_limits(
        config.rate_limiting.max_burst,
        config.rate_limiting.window(),
    ));
    info!(
        max_burst = config.rate_limiting.max_burst,
        window_ms = config.rate_limiting.window_ms,
        key_policy = ?config.rate_limiting.key_policy,
        "Rate limiter registry initialized"
    );

    let tracer = Tracer::init(
        config.telemetry.tracer_name.clone(),
        config.telemetry.exporter.build(),
    );

    let pipeline = RequestPipeline::new(registry, Arc::clone(&tracer));
    let state = AppState::new(pipeline, Arc::new(store), config.rate_limiting.key_policy);

    // Run the server with graceful shutdown on Ctrl+C
    let result = HttpServer::new(config.server.bind_addr, state)
        .serve_with_shutdown(shutdown_signal())
        .await;

    tracer.shutdown();
    result?;

    info!("Meal Service stopped");
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolve on Ctrl+C or SIGTERM; the server then drains in-flight requests.
async fn shutdown_signal() {
    let received = tokio::select! {
        res = signal::ctrl_c() => res.map(|_| "SIGINT"),
        res = terminate() => res.map(|_| "SIGTERM"),
    };

    match received {
        Ok(name) => info!(signal = name, "Draining meal requests before shutdown"),
        Err(e) => warn!(error = %e, "Signal listener failed, shutting down"),
    }
}

#[cfg(unix)]
async fn terminate() -> std::io::Result<()> {
    signal::unix::signal(signal::unix::SignalKind::terminate())?
        .recv()
        .await;
    Ok(())
}

#[cfg(not(unix))]
async fn terminate() -> std::io::Result<()> {
    std::future::pending().await
}
