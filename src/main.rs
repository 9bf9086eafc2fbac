//! filedock server binary.
//!
//! Startup sequence: tracing, configuration, metrics, credential store and
//! pipeline assembly, config watcher, listener, serve until Ctrl+C.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use filedock::config::watcher::ConfigWatcher;
use filedock::config::{load_config, ServerConfig};
use filedock::observability::{init_tracing, metrics};
use filedock::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "filedock")]
#[command(about = "Personal HTTP file-sharing server", long_about = None)]
struct Cli {
    /// Configuration file. Watched for changes; the hot-reloadable subset
    /// applies without restart.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("filedock=debug,tower_http=debug");

    let cli = Cli::parse();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "filedock starting");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    tracing::info!(
        bind_address = %config.listener.bind_address,
        trusted_proxies = config.trusted_proxies,
        roots = config.roots.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Watch the config file; invalid edits keep the running configuration.
    // `_idle_tx` keeps the update channel open when no file is watched.
    let (_idle_tx, mut config_rx) = mpsc::unbounded_channel();
    let mut _watcher = None;
    if let Some(path) = &cli.config {
        let (watcher, updates) = ConfigWatcher::new(path);
        _watcher = Some(watcher.run()?);
        config_rx = updates;
    }

    let shutdown = Shutdown::new();
    shutdown.listen_for_ctrl_c();

    let use_tls = config.listener.tls.is_some();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config).await?;

    if use_tls {
        let addr = bind_address.parse()?;
        server.run_tls(addr, config_rx, shutdown.subscribe()).await?;
    } else {
        let listener = TcpListener::bind(&bind_address).await?;
        server.run(listener, config_rx, shutdown.subscribe()).await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
