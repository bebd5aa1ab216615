use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use upstream_proxy::config::{load_config, watcher, ProxyConfig};
use upstream_proxy::lifecycle::Shutdown;
use upstream_proxy::observability::{logging, metrics};
use upstream_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "upstream-proxy", about = "Reverse-proxy load balancer")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("upstream-proxy v0.1.0 starting");

    let bind_address = args
        .listen
        .unwrap_or_else(|| config.listener.bind_address.clone());
    tracing::info!(
        bind_address = %bind_address,
        pools = config.pools.len(),
        retry_budget_secs = config.proxy.retry_budget_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&bind_address).await?;
    let server = HttpServer::new(&config)?;

    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match &args.config {
        Some(path) => Some(watcher::spawn_config_watcher(
            path.clone(),
            server.shared_balancer(),
        )?),
        None => None,
    };

    let shutdown = Shutdown::new();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
