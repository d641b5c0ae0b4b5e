//! FinMate Currency CLI
//!
//! Lists currencies, selects the display currency, refreshes exchange rates
//! and converts base-currency amounts from the command line.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use finmate_common::Grouping;
use finmate_fx::{CurrencyFacade, FxConfig};

mod commands;

use commands::Command;

/// Store file used when none is configured.
const DEFAULT_STORE_FILE: &str = "finmate.json";

/// FinMate currency CLI
#[derive(Parser, Debug)]
#[command(name = "finmate")]
#[command(about = "Display-currency selection and exchange rate cache")]
struct Args {
    /// Path of the state file (overrides FINMATE_STORE_PATH)
    #[arg(long)]
    store: Option<PathBuf>,

    /// Digit grouping: lakh or thousands
    #[arg(long)]
    grouping: Option<Grouping>,

    /// Use saved rates only; no startup refresh is attempted
    #[arg(long)]
    offline: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    // Load configuration
    let mut config = FxConfig::from_env();
    if let Some(store) = args.store {
        config.storage.path = Some(store);
    }
    if config.storage.path.is_none() {
        config.storage.path = Some(PathBuf::from(DEFAULT_STORE_FILE));
    }
    if let Some(grouping) = args.grouping {
        config.grouping = grouping;
    }
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let facade = CurrencyFacade::from_config(&config)?;
    if args.offline || args.command.refreshes() {
        facade.load().await;
    } else if let Err(e) = facade.initialize().await.await {
        error!(error = %e, "Startup refresh task failed");
    }

    let output = commands::execute(&facade, &args.command).await?;
    print!("{output}");

    info!("Done");
    Ok(())
}
