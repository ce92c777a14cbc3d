//! Dendrite demo binary
//!
//! End-to-end wiring of `AggregateFactory` against `DynamoEventStore`: a
//! small standalone program, not part of the library's public contract.
//! Run with:
//!
//!   EVENT_STORE_TABLE_NAME=... AWS_REGION=... cargo run --bin dendrite-demo

use std::sync::Arc;

use dendrite::config::DynamoStoreConfig;
use dendrite::domain::{CreateLedgerCommand, CreditLedgerCommand, Balance, Amount, Ledger, LedgerEvent};
use dendrite::factory::AggregateFactory;
use dendrite::handler::HandlerRegistry;
use dendrite::store::dynamo::DynamoEventStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dendrite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = DynamoStoreConfig::from_env()?;
    tracing::info!(table = %config.table_name, region = %config.region, "connecting to dynamodb");

    let store: Arc<DynamoEventStore<LedgerEvent>> = Arc::new(DynamoEventStore::connect(&config).await);
    let handlers: HandlerRegistry<LedgerEvent> = HandlerRegistry::new();
    let factory = AggregateFactory::<Ledger, _>::new(store, config.log_id_generator.clone(), handlers);

    let mut ledger = factory.new_aggregate();
    tracing::info!(log_id = ledger.log_id(), "creating ledger");

    ledger
        .create_ledger(CreateLedgerCommand {
            initial_balance: Balance::zero(),
        })
        .await?;

    ledger
        .credit(CreditLedgerCommand {
            amount: Amount::from_integer(10)?,
        })
        .await?;

    tracing::info!(balance = %ledger.state().balance(), "ledger updated");

    let reloaded = factory.load(ledger.log_id().to_string()).await?;
    tracing::info!(balance = %reloaded.state().balance(), "ledger reloaded from its log");

    Ok(())
}
