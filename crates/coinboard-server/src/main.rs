use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coinboard::config::{default_config_path, ResolvedConfig};
use coinboard::market_data::providers::build_price_source;
use coinboard::portfolio::{PortfolioService, Scheduler};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "coinboard-server")]
#[command(about = "Serve the portfolio dashboard API and take daily snapshots")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Override the listen address from config
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr).json())
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load coinboard config: {}", cli.config.display()))?;

    let prices = build_price_source(&config.price_source)?;
    let service = Arc::new(PortfolioService::from_config(&config, prices));
    service.bootstrap().await?;

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = tokio::spawn(
        Scheduler::new(service.clone(), config.schedule.poll_interval).run(async move {
            let _ = shutdown_rx.changed().await;
        }),
    );

    let bind = cli.bind.unwrap_or(config.server.bind);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!(addr = %bind, "coinboard server listening");

    axum::serve(listener, coinboard_server::router(service))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    scheduler.await?;
    Ok(())
}
