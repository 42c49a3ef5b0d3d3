//! CrownFX Exchange Binary
//!
//! The rate-authority service: consumes conversion commands, runs the
//! decision engine and publishes result events.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crownfx_broker::Broker;
use crownfx_common::CurrencyCode;
use crownfx_engine::{CurrencyRegistry, PipelineBuilder};
use crownfx_exchange::{CommandWorker, ExchangeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting CrownFX exchange service");

    // Load configuration
    let config = ExchangeConfig::from_env();
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    // Seed the base currencies; rates and catalog data arrive through
    // the management APIs in a full deployment.
    let currencies = Arc::new(CurrencyRegistry::new());
    currencies.register(CurrencyCode::oro(), "Ouro Real")?;
    currencies.register(CurrencyCode::tib(), "Tibar")?;

    let pipeline = Arc::new(PipelineBuilder::new().currencies(currencies).build());

    let broker = Broker::with_partitions(config.partitions);
    let worker = CommandWorker::new(&config, &broker, pipeline);

    // Set up graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    info!(
        command_topic = %config.command_topic,
        event_topic = %config.event_topic,
        consumer_group = %config.consumer_group,
        "Exchange service running"
    );

    worker.run(shutdown_rx).await;

    info!("Exchange service shutdown complete");
    Ok(())
}
