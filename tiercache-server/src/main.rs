use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tiercache_server::cache::warm;
use tiercache_server::{AppState, ServerConfig, TieredCache, create_router, init_metrics};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tiercache-server", version, about = "Two-tier cache server")]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config);
    info!("Starting Tiercache Server v{}", env!("CARGO_PKG_VERSION"));

    init_metrics();

    let cache = Arc::new(TieredCache::new(config.cache.clone()));
    if config.cache.warmup_enabled {
        warm(&cache);
    }

    let app = create_router(AppState::new(
        Arc::clone(&cache),
        config.server.admin_token.clone(),
    ));

    let addr = config.server_addr();
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let queued L2 writes land before exit
    cache.flush().await;
    info!("Shutdown complete");

    Ok(())
}

fn init_tracing(config: &ServerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
