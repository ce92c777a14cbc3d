//! End-to-end scenarios S1, S2, S5, S6, driven against
//! [`dendrite::store::memory::InMemoryStore`] and the `Ledger` worked
//! example.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use rust_decimal_macros::dec;

use dendrite::domain::ledger::read_model::InMemoryLedgerReadModel;
use dendrite::domain::{Amount, Balance, CreateLedgerCommand, CreditLedgerCommand, LedgerError, LedgerEvent};
use dendrite::error::{DendriteError, DendriteResult};
use dendrite::event::Event;
use dendrite::factory::AggregateFactory;
use dendrite::handler::{EventHandler, HandlerRegistry};
use dendrite::store::memory::InMemoryStore;
use dendrite::store::StartingPoint;
use dendrite::EventStore;

fn amount(value: rust_decimal::Decimal) -> Amount {
    Amount::new(value).unwrap()
}

/// A handler that always fails, to exercise the "event is durable even if
/// the handler then throws" half of S5.
struct AlwaysFailingHandler;

#[async_trait]
impl EventHandler<LedgerEvent> for AlwaysFailingHandler {
    async fn handle_event(&self, _events: &[Event<LedgerEvent>]) -> DendriteResult<()> {
        Err(DendriteError::Unsupported("read model unavailable"))
    }
}

/// S1: create, credit, credit — three events land in order, and the
/// balance reflects all three.
#[tokio::test]
async fn s1_create_then_two_credits_produce_ordered_log_and_correct_balance() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let factory = AggregateFactory::new(
        store.clone(),
        Arc::new(dendrite::config::uuid_log_id_generator),
        HandlerRegistry::new(),
    );

    let mut ledger = factory.new_aggregate();
    let log_id = ledger.log_id().to_string();

    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();
    ledger.credit(CreditLedgerCommand { amount: amount(dec!(10)) }).await.unwrap();
    ledger.credit(CreditLedgerCommand { amount: amount(dec!(5)) }).await.unwrap();

    assert_eq!(ledger.state().balance(), dec!(15));

    let log = store.get_log(&log_id).await.unwrap();
    assert_eq!(log.len(), 3);
    assert!(matches!(log[0].payload, LedgerEvent::LedgerCreated { .. }));
    assert!(matches!(log[1].payload, LedgerEvent::LedgerCredited { .. }));
    assert!(matches!(log[2].payload, LedgerEvent::LedgerCredited { .. }));

    // event_ids strictly increase lexicographically.
    assert!(log[0].event_id < log[1].event_id);
    assert!(log[1].event_id < log[2].event_id);
}

/// S2: loading the same log into a fresh aggregate reproduces its balance,
/// and replay never invokes registered handlers.
#[tokio::test]
async fn s2_load_reproduces_balance_without_firing_handlers_during_replay() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let read_model = InMemoryLedgerReadModel::new();
    let handlers = HandlerRegistry::new()
        .register("LedgerCreated", read_model.clone())
        .register("LedgerCredited", read_model.clone());
    let factory = AggregateFactory::new(
        store,
        Arc::new(dendrite::config::uuid_log_id_generator),
        handlers,
    );

    let mut ledger = factory.new_aggregate();
    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();
    ledger.credit(CreditLedgerCommand { amount: amount(dec!(10)) }).await.unwrap();
    ledger.credit(CreditLedgerCommand { amount: amount(dec!(5)) }).await.unwrap();

    let invocations_from_writes = read_model.invocations.load(Ordering::SeqCst);
    assert_eq!(invocations_from_writes, 3);

    let loaded = factory.load(ledger.log_id().to_string()).await.unwrap();
    assert_eq!(loaded.state().balance(), dec!(15));
    assert_eq!(
        read_model.invocations.load(Ordering::SeqCst),
        invocations_from_writes,
        "replay must not invoke handlers registered for the replayed event types"
    );
}

/// S5: a handler registered for `LedgerCredited` is invoked exactly once
/// per credit, with a one-element batch, after the write is durable.
#[tokio::test]
async fn s5_handler_invoked_exactly_once_per_apply() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let read_model = InMemoryLedgerReadModel::new();
    let handlers = HandlerRegistry::new().register("LedgerCredited", read_model.clone());
    let factory = AggregateFactory::new(
        store,
        Arc::new(dendrite::config::uuid_log_id_generator),
        handlers,
    );

    let mut ledger = factory.new_aggregate();
    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();
    ledger.credit(CreditLedgerCommand { amount: amount(dec!(7)) }).await.unwrap();

    assert_eq!(read_model.invocations.load(Ordering::SeqCst), 1);
    assert_eq!(read_model.last_balance(), dec!(7));
}

/// S5 (handler-failure half): "event is durable even if handler then
/// throws" -- the error must reach the caller of `credit`, but the event
/// must already be in the log and the aggregate's in-memory state must
/// already reflect it.
#[tokio::test]
async fn s5_event_is_durable_even_though_handler_then_fails() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let handlers = HandlerRegistry::new().register("LedgerCredited", Arc::new(AlwaysFailingHandler));
    let factory = AggregateFactory::new(
        store.clone(),
        Arc::new(dendrite::config::uuid_log_id_generator),
        handlers,
    );

    let mut ledger = factory.new_aggregate();
    let log_id = ledger.log_id().to_string();
    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();

    let result = ledger.credit(CreditLedgerCommand { amount: amount(dec!(7)) }).await;

    assert!(matches!(result, Err(LedgerError::Store(ref e)) if !e.is_concurrency_violation()));
    assert_eq!(ledger.state().balance(), dec!(7), "state must already reflect the durable event");

    let log = store.get_log(&log_id).await.unwrap();
    assert_eq!(log.len(), 2, "credit must be durable even though its handler failed");
}

/// S6: `get_log_from` with a starting point strictly after every event
/// returns an empty sequence.
#[tokio::test]
async fn s6_get_log_from_future_timestamp_is_empty() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let factory = AggregateFactory::new(
        store.clone(),
        Arc::new(dendrite::config::uuid_log_id_generator),
        HandlerRegistry::new(),
    );

    let mut ledger = factory.new_aggregate();
    let log_id = ledger.log_id().to_string();
    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();

    let an_hour_from_now = chrono::Utc::now() + chrono::Duration::hours(1);
    let from = store
        .get_log_from(&log_id, StartingPoint::Timestamp(an_hour_from_now))
        .await
        .unwrap();
    assert!(from.is_empty());
}

/// A freshly-generated `log_id` has no metadata until the first
/// successful apply, after which the log is non-empty.
#[tokio::test]
async fn first_write_creates_the_log_metadata() {
    let store = Arc::new(InMemoryStore::<LedgerEvent>::new());
    let factory = AggregateFactory::new(
        store.clone(),
        Arc::new(dendrite::config::uuid_log_id_generator),
        HandlerRegistry::new(),
    );

    let mut ledger = factory.new_aggregate();
    let log_id = ledger.log_id().to_string();
    assert!(store.get_log(&log_id).await.unwrap().is_empty());

    ledger
        .create_ledger(CreateLedgerCommand { initial_balance: Balance::zero() })
        .await
        .unwrap();

    let log = store.get_log(&log_id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].event_id, ledger.last_event_id().map(str::to_string));
}
