use anyhow::{Context, Result};
use clap::Parser;
use nuance_transcribe::{
    create_router, AppState, Config, ControlHandler, NatsCallLocator, NatsClient, NatsEventBus,
    NatsRecognizer, RecognizerBackend, SessionManager,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nuance-transcribe", version, about = "Real-time call transcription bridge")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/nuance-transcribe")]
    config: String,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("HTTP server will bind to {}:{}", cfg.service.http.bind, cfg.service.http.port);

    let client = NatsClient::connect(&cfg.nats.url).await?;

    let (bus, bus_task) = NatsEventBus::spawn(client.clone(), cfg.subjects.clone());
    let backend = Arc::new(NatsRecognizer::new(client.clone(), cfg.subjects.clone()));
    let manager = SessionManager::new(backend.clone(), Arc::new(bus), cfg.transcribe.vendor.clone());
    let locator = Arc::new(NatsCallLocator::new(client.clone(), cfg.subjects.clone()));
    let control = Arc::new(ControlHandler::new(
        locator,
        manager.clone(),
        cfg.transcribe.default_bug_name.clone(),
    ));

    let router = create_router(AppState::new(control));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Transcription control API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    manager.shutdown().await;
    drop(manager);
    backend.shutdown().await?;

    // The pump drains once the last session releases the bus
    if tokio::time::timeout(Duration::from_secs(2), bus_task).await.is_err() {
        warn!("Event pump did not drain before exit");
    }

    info!("Stopped");
    Ok(())
}
