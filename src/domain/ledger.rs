//! Ledger aggregate
//!
//! A balance that only ever moves through `LedgerCreated`,
//! `LedgerCredited`, and `LedgerDebited` events. Grounded in
//! `original_source/packages/sh_api/src/sh_api/domain/ledger.py` (and its
//! `Decimal`-typed sibling in `packages/api/src/domain/ledger.py`, which
//! this crate follows for its choice of `rust_decimal::Decimal`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DendriteResult;
use crate::event::{Event, EventPayload};
use crate::store::EventStore;

use super::amount::{Amount, AmountError, Balance};

/// Ledger's event payload. A sealed enum rather than a fully-qualified
/// type name looked up at read time: the store only ever needs
/// `type_tag()` and this enum's own `Deserialize` impl.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum LedgerEvent {
    LedgerCreated {
        ledger_id: String,
        initial_balance: Decimal,
    },
    LedgerCredited {
        ledger_id: String,
        amount: Decimal,
        current_balance: Decimal,
    },
    LedgerDebited {
        ledger_id: String,
        amount: Decimal,
        current_balance: Decimal,
    },
}

impl EventPayload for LedgerEvent {
    fn type_tag(&self) -> &'static str {
        match self {
            LedgerEvent::LedgerCreated { .. } => "LedgerCreated",
            LedgerEvent::LedgerCredited { .. } => "LedgerCredited",
            LedgerEvent::LedgerDebited { .. } => "LedgerDebited",
        }
    }
}

/// Domain state: just the running balance. `None` before `LedgerCreated`
/// has ever folded in, matching the source's `self.balance = None` until
/// `create_ledger` runs.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    balance: Option<Balance>,
}

impl Ledger {
    /// Current balance, or zero for a not-yet-created ledger.
    pub fn balance(&self) -> Decimal {
        self.balance.as_ref().map(Balance::value).unwrap_or(Decimal::ZERO)
    }

    pub fn is_created(&self) -> bool {
        self.balance.is_some()
    }
}

impl Aggregate for Ledger {
    type Event = LedgerEvent;

    fn on(&mut self, event: &Event<Self::Event>) {
        match &event.payload {
            LedgerEvent::LedgerCreated { initial_balance, .. } => {
                self.balance = Balance::new(*initial_balance).ok();
            }
            LedgerEvent::LedgerCredited { current_balance, .. }
            | LedgerEvent::LedgerDebited { current_balance, .. } => {
                self.balance = Balance::new(*current_balance).ok();
            }
        }
    }
}

/// `create_ledger`'s single argument (source: `CreateLedgerCommand`).
#[derive(Debug, Clone)]
pub struct CreateLedgerCommand {
    pub initial_balance: Balance,
}

/// `credit`'s single argument (source: `CreditLedgerCommand`).
#[derive(Debug, Clone)]
pub struct CreditLedgerCommand {
    pub amount: Amount,
}

/// `debit`'s single argument (source: `DebitLedgerCommand`).
#[derive(Debug, Clone)]
pub struct DebitLedgerCommand {
    pub amount: Amount,
}

/// Errors a ledger command can surface beyond the store's own
/// [`crate::error::DendriteError`]: an amount that would make the balance
/// negative or otherwise invalid. `debit` relies on
/// [`Balance::debit`] rejecting a negative result with
/// [`AmountError::NotPositive`] -- in this domain that rejection *is* the
/// insufficient-balance check, not a separate rule bolted on afterward.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Balance(#[from] AmountError),
    #[error(transparent)]
    Store(#[from] crate::error::DendriteError),
}

impl LedgerError {
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, Self::Balance(AmountError::NotPositive(_)))
    }
}

/// Domain methods live on `AggregateRoot<Ledger, S>` directly, the same way
/// `Ledger.create_ledger`/`credit`/`debit` live directly on the source's
/// `Ledger(Aggregate)` subclass: construct an event from the command plus
/// current state, then `apply` it.
impl<S: EventStore<LedgerEvent>> AggregateRoot<Ledger, S> {
    pub async fn create_ledger(&mut self, command: CreateLedgerCommand) -> DendriteResult<()> {
        let event = Event::new(LedgerEvent::LedgerCreated {
            ledger_id: self.log_id().to_string(),
            initial_balance: command.initial_balance.value(),
        });
        self.apply(event).await
    }

    pub async fn credit(&mut self, command: CreditLedgerCommand) -> Result<(), LedgerError> {
        let current = self.state().balance.clone().unwrap_or_else(Balance::zero);
        let new_balance = current.credit(&command.amount)?;
        let event = Event::new(LedgerEvent::LedgerCredited {
            ledger_id: self.log_id().to_string(),
            amount: command.amount.value(),
            current_balance: new_balance.value(),
        });
        self.apply(event).await?;
        Ok(())
    }

    pub async fn debit(&mut self, command: DebitLedgerCommand) -> Result<(), LedgerError> {
        let current = self.state().balance.clone().unwrap_or_else(Balance::zero);
        let new_balance = current.debit(&command.amount)?;
        let event = Event::new(LedgerEvent::LedgerDebited {
            ledger_id: self.log_id().to_string(),
            amount: command.amount.value(),
            current_balance: new_balance.value(),
        });
        self.apply(event).await?;
        Ok(())
    }
}

/// A minimal [`crate::handler::EventHandler`] demonstrating fan-out without
/// a relational read-model projection: it keeps a running tally in memory
/// rather than writing to a database, standing in for `LedgerReadModel`
/// (source: `sh_api/domain/ledger.py`) wherever tests need a handler to
/// observe.
pub mod read_model {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::event::Event;
    use crate::handler::EventHandler;

    use super::LedgerEvent;

    /// Tracks the number of times it has observed an event and the last
    /// balance it saw, purely in memory.
    #[derive(Default)]
    pub struct InMemoryLedgerReadModel {
        pub invocations: AtomicI64,
        last_balance: Mutex<Decimal>,
    }

    impl InMemoryLedgerReadModel {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn last_balance(&self) -> Decimal {
            *self.last_balance.lock().unwrap()
        }
    }

    #[async_trait]
    impl EventHandler<LedgerEvent> for InMemoryLedgerReadModel {
        async fn handle_event(&self, events: &[Event<LedgerEvent>]) -> crate::error::DendriteResult<()> {
            for event in events {
                self.invocations.fetch_add(1, Ordering::SeqCst);
                let balance = match &event.payload {
                    LedgerEvent::LedgerCreated { initial_balance, .. } => *initial_balance,
                    LedgerEvent::LedgerCredited { current_balance, .. } => *current_balance,
                    LedgerEvent::LedgerDebited { current_balance, .. } => *current_balance,
                };
                *self.last_balance.lock().unwrap() = balance;
            }
            Ok(())
        }
    }
}
