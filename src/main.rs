//! tx-relay command line.
//!
//! ```text
//! tx-relay [--config relay.toml] health
//! tx-relay [--config relay.toml] send --file tx.json [--skip-simulation]
//! tx-relay [--config relay.toml] watch
//! ```
//!
//! `send` reads a JSON document of the form
//! `{"transaction": "<base64>", "durable_nonce": false}`.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use tx_relay::config::loader::load_config;
use tx_relay::lifecycle::shutdown_signal;
use tx_relay::observability::{logging, metrics};
use tx_relay::{RawTransaction, Relay};

#[derive(Parser)]
#[command(name = "tx-relay")]
#[command(about = "Resilient multi-endpoint transaction relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "relay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every endpoint once and print its health
    Health,
    /// Simulate, broadcast and confirm a transaction
    Send {
        #[arg(short, long)]
        file: PathBuf,
        #[arg(long)]
        skip_simulation: bool,
    },
    /// Run the health monitor until Ctrl+C
    Watch,
}

#[derive(Serialize)]
struct SendOutput<'a> {
    delivery_id: &'a str,
    status: &'a str,
    attempts: u32,
    signature: Option<&'a str>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.observability);
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    tracing::info!(
        config = %cli.config.display(),
        endpoints = config.endpoints.len(),
        "tx-relay v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        Commands::Health => {
            let relay = Relay::connect(config).await?;
            relay.health_monitor().sweep().await;
            print_json(&relay.endpoint_health())?;
            relay.shutdown().await;
        }
        Commands::Send {
            file,
            skip_simulation,
        } => {
            let content = std::fs::read_to_string(&file)?;
            let mut transaction: RawTransaction = serde_json::from_str(&content)?;

            let mut options = config.delivery.clone();
            options.skip_simulation |= skip_simulation;

            let relay = Relay::connect(config).await?;
            let output = match relay.send_and_confirm(&mut transaction, Some(&options)).await {
                Ok(receipt) => serde_json::to_value(SendOutput {
                    delivery_id: &receipt.delivery_id,
                    status: "CONFIRMED",
                    attempts: receipt.attempts,
                    signature: Some(&receipt.signature),
                    error: None,
                })?,
                Err(e) => serde_json::to_value(SendOutput {
                    delivery_id: &e.delivery_id,
                    status: e.status().as_str(),
                    attempts: e.attempts,
                    signature: e.signature.as_deref(),
                    error: Some(e.failure.to_string()),
                })?,
            };
            print_json(&output)?;
            relay.shutdown().await;
        }
        Commands::Watch => {
            let mut relay = Relay::connect(config).await?;
            relay.spawn_health_monitor();

            let interval = relay.config().health_check.interval_ms.max(1_000);
            let mut ticker = tokio::time::interval(Duration::from_millis(interval));
            let signal = shutdown_signal();
            tokio::pin!(signal);
            loop {
                tokio::select! {
                    _ = ticker.tick() => print_json(&relay.endpoint_health())?,
                    _ = &mut signal => break,
                }
            }
            relay.shutdown().await;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
