//! CrownFX Simulator
//!
//! Runs the full conversion saga in one process: the transaction service
//! publishes commands, the exchange service consumes them, decides, and
//! publishes events, and the transaction service consumes those events —
//! all over the in-process broker.

use std::sync::Arc;

use clap::Parser;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crownfx_broker::Broker;
use crownfx_common::{CurrencyCode, CurrencyPair, KingdomId, ProductId};
use crownfx_engine::{
    CurrencyRegistry, KingdomInfo, MemoryProductRateRepository, MemoryRateRepository,
    PipelineBuilder, ProductExchangeRate, ProductInfo, ProductRateRepository, RateRepository,
    StaticCatalog,
};
use crownfx_exchange::{CommandWorker, ExchangeConfig};
use crownfx_transaction::{ConversionClient, EventWorker, TransactionConfig, TransactionLedger};

mod scenario;

use scenario::Scenario;

/// CrownFX Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "CrownFX conversion saga simulation environment")]
struct Args {
    /// Scenario to run (plain, product, unfavorable, unknown-currency);
    /// all scenarios when omitted
    #[arg(short, long)]
    scenario: Option<String>,

    /// How long to wait for events to settle, in milliseconds
    #[arg(long, default_value = "500")]
    settle_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let scenarios = match &args.scenario {
        Some(name) => match Scenario::from_name(name) {
            Some(scenario) => vec![scenario],
            None => return Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        },
        None => Scenario::all(),
    };

    info!("Starting CrownFX simulator");

    // One broker carries both topics for both services.
    let broker = Broker::new();

    // Exchange service with seeded reference data.
    let exchange_config = ExchangeConfig::default();
    let pipeline = Arc::new(seed_pipeline().await?);
    let command_worker = Arc::new(CommandWorker::new(&exchange_config, &broker, pipeline));

    // Transaction service.
    let transaction_config = TransactionConfig::default();
    let ledger = Arc::new(TransactionLedger::new());
    let client = ConversionClient::new(&transaction_config, &broker, ledger.clone());
    let event_worker = Arc::new(EventWorker::new(&transaction_config, &broker, ledger.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let command_task = {
        let worker = command_worker.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };
    let event_task = {
        let worker = event_worker.clone();
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    // Publish the scenario commands.
    let mut receipts = Vec::new();
    for scenario in &scenarios {
        let receipt = client.request_conversion(&scenario.request())?;
        info!(
            scenario = scenario.name(),
            correlation_id = %receipt.correlation_id,
            "Scenario command published"
        );
        receipts.push((*scenario, receipt));
    }

    // Let the saga complete.
    tokio::time::sleep(std::time::Duration::from_millis(args.settle_ms)).await;

    // Report outcomes.
    for (scenario, receipt) in &receipts {
        match ledger.by_correlation(&receipt.correlation_id) {
            Some(record) => {
                let outcome = if record.status == scenario.expected_status() {
                    "as expected"
                } else {
                    "UNEXPECTED"
                };
                info!(
                    scenario = scenario.name(),
                    status = %record.status,
                    converted = %record
                        .converted_amount
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    reason = record.reason.as_deref().unwrap_or("-"),
                    outcome,
                    "Scenario finished"
                );
            }
            None => warn!(scenario = scenario.name(), "No record for scenario"),
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = command_task.await;
    let _ = event_task.await;

    info!("Simulation complete");
    Ok(())
}

/// Build the exchange pipeline with the simulation's reference data.
async fn seed_pipeline() -> anyhow::Result<crownfx_engine::ConversionPipeline> {
    let currencies = Arc::new(CurrencyRegistry::new());
    currencies.register(CurrencyCode::oro(), "Ouro Real")?;
    currencies.register(CurrencyCode::tib(), "Tibar")?;

    let effective_date = "2024-01-01".parse()?;
    let oro_tib = CurrencyPair::new(CurrencyCode::oro(), CurrencyCode::tib());
    let tib_oro = oro_tib.inverse();

    let rates = Arc::new(MemoryRateRepository::new());
    // ORO→TIB at the reference rate; TIB→ORO priced far above its
    // reference of 0.4 so the guard rail rejects it.
    rates.save(oro_tib.clone(), Decimal::new(25, 1), effective_date).await?;
    rates.save(tib_oro, Decimal::new(12, 1), effective_date).await?;

    let product_rates = Arc::new(MemoryProductRateRepository::new());
    product_rates
        .save(ProductExchangeRate::new(
            ProductId::new(3),
            oro_tib,
            Decimal::new(30, 1),
            Decimal::new(12, 1),
            effective_date,
        ))
        .await?;

    let catalog = Arc::new(StaticCatalog::new());
    catalog.insert_kingdom(KingdomInfo {
        id: KingdomId::new(1),
        name: "Altamura".to_string(),
        quality_rate: Decimal::ONE,
        is_owner: false,
    });
    catalog.insert_product(ProductInfo {
        id: ProductId::new(3),
        name: "Silverwood bow".to_string(),
        demand_multiplier: Decimal::ONE,
        quality_multiplier: Decimal::ONE,
        kingdom_id: KingdomId::new(1),
    });

    Ok(PipelineBuilder::new()
        .currencies(currencies)
        .rates(rates)
        .product_rates(product_rates)
        .catalog(catalog)
        .build())
}
