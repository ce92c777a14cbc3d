//! Aggregate factory module
//!
//! Mirrors the source's `AggregateFactory`: one instance, built once with a
//! store, a `log_id` generator, and a handler registry, that mints fresh
//! aggregates (`new`) or rebuilds existing ones by replaying their log
//! (`load`). Span names (`aggregate_load`, `fetch_events`, `replay_events`)
//! match `aggregate_factory.py` exactly.

use std::sync::Arc;

use tracing::Instrument;

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DendriteResult;
use crate::handler::HandlerRegistry;
use crate::store::EventStore;

/// Builds [`AggregateRoot`]s of a single aggregate type `A` against a
/// single store `S`, sharing one handler registry across every instance it
/// mints: handlers are wired once, at factory construction.
pub struct AggregateFactory<A: Aggregate, S: EventStore<A::Event>> {
    store: Arc<S>,
    log_id_generator: Arc<dyn Fn() -> String + Send + Sync>,
    handlers: HandlerRegistry<A::Event>,
}

impl<A: Aggregate, S: EventStore<A::Event>> AggregateFactory<A, S> {
    pub fn new(
        store: Arc<S>,
        log_id_generator: Arc<dyn Fn() -> String + Send + Sync>,
        handlers: HandlerRegistry<A::Event>,
    ) -> Self {
        Self {
            store,
            log_id_generator,
            handlers,
        }
    }

    /// A brand-new aggregate with a freshly generated `log_id` and no
    /// history. The first [`AggregateRoot::apply`] on it passes `None` as
    /// the expected prior event.
    pub fn new_aggregate(&self) -> AggregateRoot<A, S> {
        let log_id = (self.log_id_generator)();
        AggregateRoot::new(log_id, self.store.clone(), self.handlers.clone())
    }

    /// Rebuild `log_id`'s aggregate by fetching its full event log and
    /// replaying every event through [`AggregateRoot::replay_event`] --
    /// never through `apply`, so no handler fires and no second write
    /// happens.
    pub async fn load(&self, log_id: impl Into<String>) -> DendriteResult<AggregateRoot<A, S>> {
        let log_id = log_id.into();
        let aggregate_type = std::any::type_name::<A>();

        async {
            let mut instance = AggregateRoot::new(log_id.clone(), self.store.clone(), self.handlers.clone());

            let fetch_span = tracing::info_span!("fetch_events", event_count = tracing::field::Empty);
            let events = async { self.store.get_log(&log_id).await }
                .instrument(fetch_span.clone())
                .await?;
            fetch_span.record("event_count", events.len());

            {
                let _span = tracing::info_span!("replay_events", event_count = events.len()).entered();
                for event in &events {
                    instance.replay_event(event);
                }
            }

            Ok(instance)
        }
        .instrument(tracing::info_span!("aggregate_load", aggregate_type, log_id = %log_id))
        .await
    }
}

impl<A: Aggregate, S: EventStore<A::Event>> Clone for AggregateFactory<A, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            log_id_generator: self.log_id_generator.clone(),
            handlers: self.handlers.clone(),
        }
    }
}
