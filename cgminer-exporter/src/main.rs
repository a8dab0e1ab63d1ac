//! Prometheus exporter for CGMiner and BMMiner rigs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use cgminer_exporter::{ExporterConfig, HttpServer, Scraper};

/// Prometheus exporter for CGMiner and BMMiner rigs.
#[derive(Parser, Debug)]
#[command(name = "cgminer-exporter")]
#[command(about = "Export CGMiner/BMMiner API statistics as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Log level (trace, debug, info, warn, error; overrides config).
    #[arg(long)]
    log_level: Option<String>,

    /// Worker threads. 0 runs everything on the main thread.
    #[arg(long, env = "THREADS", default_value_t = 0)]
    threads: usize,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.http.listen = listen;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    config.validate()?;
    cgminer_common::init_tracing(&config.logging)?;

    let runtime = if args.threads == 0 {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
    } else {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(args.threads)
            .enable_all()
            .build()?
    };

    runtime.block_on(run(config, args.threads))
}

async fn run(config: ExporterConfig, threads: usize) -> anyhow::Result<()> {
    info!(
        miner_port = config.miner.port,
        timeout_ms = config.miner.timeout_ms,
        concurrent = config.miner.concurrent,
        threads,
        "Starting CGMiner exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scraper = Arc::new(Scraper::from_config(&config));

    let listen_addr: SocketAddr = config
        .http
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let http_server = HttpServer::new(scraper.clone(), listen_addr);

    // Start HTTP server
    let mut http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    let server_exited = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            false
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
            false
        }
        _ = &mut http_task => {
            error!("HTTP server exited unexpectedly");
            true
        }
    };

    if !server_exited {
        shutdown_tx.send(true)?;

        // Give in-flight scrapes a chance to finish
        let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;
    }

    let stats = scraper.stats();
    info!(
        scrapes_total = stats.scrapes_total,
        scrape_failures_total = stats.scrape_failures_total,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            error!("Failed to install SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
