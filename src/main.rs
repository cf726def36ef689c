//! tgrelay binary entry point.
//!
//! Loads configuration, initialises logging, and runs the adapter. Until a
//! host framework attaches, inbound events are drained to the log so the
//! process is observable on its own.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use tgrelay::adapter::{Command, TelegramAdapter};
use tgrelay::config::Config;
use tgrelay::logging;

/// Telegram adapter bridging updates into a framework-agnostic message bus.
#[derive(Parser)]
#[command(name = "tgrelay", version)]
struct Cli {
    /// Path to a config file (overrides TGRELAY_CONFIG_PATH).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to stderr only, skipping the JSON file layer.
    #[arg(long)]
    console_only: bool,

    /// Directory for JSON log files.
    #[arg(long, default_value = "logs")]
    logs_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        std::env::set_var("TGRELAY_CONFIG_PATH", path);
    }
    let config = Config::load().context("failed to load configuration")?;

    let _guard = if cli.console_only {
        logging::init_console(&config.log_level);
        None
    } else {
        Some(logging::init_production(&cli.logs_dir, &config.log_level)?)
    };

    let adapter = TelegramAdapter::new(config).context("failed to build adapter")?;

    let (events_tx, mut events_rx) = mpsc::channel(100);
    let (commands_tx, commands_rx) = mpsc::channel(100);

    // Stand-in event consumer; a host framework would attach here.
    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            info!(?event, "inbound event");
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = commands_tx.send(Command::Shutdown).await;
        }
    });

    adapter.run(events_tx, commands_rx).await?;
    Ok(())
}
