//! Aggregate module
//!
//! [`Aggregate`] is the domain-state half of an event-sourced entity: it
//! only knows how to fold one event into itself (`on`). The bookkeeping
//! half -- `log_id`, store handle, handler registry, last-applied
//! `event_id` -- lives on [`AggregateRoot`], which is what callers actually
//! construct and hold. This split is the Rust rendering of the source's
//! single `Aggregate` base class (`aggregate.py`): Python attaches the
//! bookkeeping fields to every subclass instance via `__init__`; here they
//! live once, generically, on the wrapper instead of being re-derived per
//! concrete aggregate.

use std::sync::Arc;

use tracing::Instrument;

use crate::error::DendriteResult;
use crate::event::{format_event_id, Event, EventPayload};
use crate::handler::HandlerRegistry;
use crate::store::EventStore;

/// Domain-state fold. Implementors own only their fields and `on`; they
/// never see the store, the handler registry, or tracing directly.
pub trait Aggregate: Default + Send + Sync + 'static {
    type Event: EventPayload;

    /// Fold `event` into `self`. Called for every event, whether freshly
    /// applied or replayed during `AggregateFactory::load` -- `on` itself
    /// must not distinguish the two; only event handlers are exempted from
    /// firing during replay, never the aggregate's own state transition.
    fn on(&mut self, event: &Event<Self::Event>);
}

/// An aggregate instance bound to a specific log and store.
///
/// Invariants: `last_event_id` always equals the `event_id` of the most
/// recently folded event (applied or replayed); `apply`'s three steps --
/// durable write, state fold, handler dispatch -- happen in that order and
/// are independently traced.
pub struct AggregateRoot<A: Aggregate, S: EventStore<A::Event>> {
    log_id: String,
    store: Arc<S>,
    handlers: HandlerRegistry<A::Event>,
    last_event_id: Option<String>,
    state: A,
}

impl<A: Aggregate, S: EventStore<A::Event>> AggregateRoot<A, S> {
    pub fn new(log_id: impl Into<String>, store: Arc<S>, handlers: HandlerRegistry<A::Event>) -> Self {
        Self {
            log_id: log_id.into(),
            store,
            handlers,
            last_event_id: None,
            state: A::default(),
        }
    }

    pub fn log_id(&self) -> &str {
        &self.log_id
    }

    pub fn state(&self) -> &A {
        &self.state
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Fold `event` without touching the store or handlers: used during
    /// `AggregateFactory::load`'s replay pass and available directly to
    /// anything reconstructing state out-of-band.
    pub fn replay_event(&mut self, event: &Event<A::Event>) {
        self.last_event_id = event.event_id.clone();
        self.state.on(event);
    }

    /// Stamp, durably append, fold, and dispatch -- the full `apply`
    /// contract.
    ///
    /// 1. If `event.event_id` is unset, stamp `event_id` and `applied_time`.
    /// 2. `apply.event_store`: append via the store, passing `last_event_id`
    ///    as the expected prior event (`None` on a brand-new log).
    /// 3. `apply.event_sourcing_handler`: fold into `self.state` and advance
    ///    `last_event_id`.
    /// 4. `apply.event_handlers`: dispatch to every handler registered for
    ///    this event's type tag.
    ///
    /// On a [`crate::error::DendriteError::ConcurrencyViolation`] from step
    /// 2, `self.state`/`last_event_id` are left untouched -- the caller
    /// decides whether to [`Self::reload`] and retry (see
    /// [`crate::retry::RetryPolicy`]).
    ///
    /// A handler error from step 4 propagates to the caller too, but by
    /// then the event is already durable and `self.state`/`last_event_id`
    /// already reflect it -- the contract is "event is persisted; one or
    /// more projections may be stale," never "the write failed." Handlers
    /// after the failing one in registration order do not run.
    pub async fn apply(&mut self, mut event: Event<A::Event>) -> DendriteResult<()> {
        if event.event_id.is_none() {
            let now = chrono::Utc::now();
            event.event_id = Some(format_event_id(now, event.short_name()));
            event.applied_time = Some(now);
        }

        let log_id = self.log_id.clone();
        let expected = self.last_event_id.clone();
        let store = self.store.clone();

        async {
            store
                .apply(&log_id, &mut event, expected.as_deref())
                .await
        }
        .instrument(tracing::info_span!("apply.event_store"))
        .await?;

        {
            let _span = tracing::info_span!("apply.event_sourcing_handler").entered();
            self.replay_event(&event);
        }

        async { self.handlers.dispatch(&event).await }
            .instrument(tracing::info_span!("apply.event_handlers"))
            .await
    }

    /// Discard in-memory state and rebuild from the full stored log, the
    /// same reload-then-retry pattern the concurrency test harness uses.
    /// Used by [`crate::retry::RetryPolicy`] after a concurrency violation.
    pub async fn reload(&mut self) -> DendriteResult<()> {
        let events = self.store.get_log(&self.log_id).await?;
        self.state = A::default();
        self.last_event_id = None;
        for event in &events {
            self.replay_event(event);
        }
        Ok(())
    }
}
