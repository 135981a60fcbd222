use anyhow::{Context, Result};
use tokio::sync::watch;

use market_pulse::config::Config;
use market_pulse::finnhub::FinnhubRestClient;
use market_pulse::scheduler::RefreshScheduler;
use market_pulse::server;
use market_pulse::snapshot::SnapshotWriter;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(&config.logging.level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+). Already
    // installed is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Make sure .env or the environment provides FINNHUB_API_KEY");
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    let symbols = config.refresh.watchlist()?;
    tracing::info!(
        symbols = ?symbols,
        upstream = %config.upstream.base_url,
        interval_secs = config.refresh.interval_secs,
        "Starting market-pulse"
    );

    let client = FinnhubRestClient::new(
        &config.upstream.base_url,
        &config.upstream.token,
        config.upstream.timeout(),
    )?;
    let writer = SnapshotWriter::new(config.output.snapshot_paths());
    let scheduler = RefreshScheduler::new(client, writer, symbols, config.refresh.settings());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server_task = if config.server.enabled {
        let addr = config.server.bind_addr()?;
        let paths = config.output.snapshot_paths();
        let server_shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = server::serve(addr, paths, server_shutdown).await {
                tracing::error!(error = %format!("{:#}", e), "Snapshot server exited");
            }
        }))
    } else {
        tracing::info!("Snapshot server disabled");
        None
    };

    let refresh_task = tokio::spawn(scheduler.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    refresh_task.await.context("refresh task panicked")?;
    if let Some(task) = server_task {
        task.await.context("server task panicked")?;
    }
    Ok(())
}
