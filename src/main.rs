use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coinboard::config::{default_config_path, ResolvedConfig};
use coinboard::format::format_snapshot_table;
use coinboard::market_data::providers::build_price_source;
use coinboard::portfolio::{PortfolioService, Scheduler};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "coinboard")]
#[command(about = "Crypto portfolio valuation with daily history snapshots")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Value the portfolio at current prices
    Value {
        /// Print a plain-text table instead of JSON
        #[arg(long)]
        table: bool,

        /// Decimal places for table values
        #[arg(long, default_value_t = 2)]
        decimals: u32,
    },
    /// Show stored history plus a live point
    History,
    /// Take the scheduled snapshot now
    Snapshot,
    /// Run the daily snapshot scheduler until interrupted
    Daemon,
    /// Show resolved configuration
    Config,
}

fn build_service(config: &ResolvedConfig) -> Result<Arc<PortfolioService>> {
    let prices = build_price_source(&config.price_source)?;
    Ok(Arc::new(PortfolioService::from_config(config, prices)))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .json(),
        )
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load coinboard config: {}", cli.config.display()))?;

    match cli.command {
        Command::Config => {
            println!("Config file: {}", cli.config.display());
            print_json(&config)?;
        }
        Command::Value { table, decimals } => {
            let service = build_service(&config)?;
            match service.compute_valuation().await {
                Some(snapshot) if table => print!("{}", format_snapshot_table(&snapshot, decimals)),
                Some(snapshot) => print_json(&json!({ "status": "success", "data": snapshot }))?,
                None => print_json(&json!({ "status": "error" }))?,
            }
        }
        Command::History => {
            let history = build_service(&config)?.display_history().await;
            print_json(&json!({ "status": "success", "history": history }))?;
        }
        Command::Snapshot => {
            let service = build_service(&config)?;
            service.bootstrap().await?;
            let outcome = service.run_scheduled_snapshot().await?;
            print_json(&outcome)?;
        }
        Command::Daemon => {
            let service = build_service(&config)?;
            service.bootstrap().await?;
            Scheduler::new(service, config.schedule.poll_interval)
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
    }

    Ok(())
}
