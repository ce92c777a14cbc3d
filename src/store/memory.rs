//! In-memory event store
//!
//! A concurrency-capable test double: real conditional-write semantics
//! (check expected `last_event`, then write) without external
//! infrastructure, which is what lets property tests reproduce the same
//! race [`crate::store::dynamo::DynamoEventStore`] resolves via
//! `TransactWriteItems`. Grounded in the source's
//! `InMemoryEventStore`/`SingleLogEventStore` test doubles, generalized
//! here to actually enforce the concurrency tag (the source's in-memory
//! store did not — every caller always "won").

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{DendriteError, DendriteResult};
use crate::event::{Event, EventPayload};

use super::{EventStore, StartingPoint};

#[derive(Default)]
struct Log<P: EventPayload> {
    events: Vec<Event<P>>,
    last_event: Option<String>,
}

/// Per-log-id concurrent in-memory event store.
pub struct InMemoryStore<P: EventPayload> {
    logs: DashMap<String, Log<P>>,
}

impl<P: EventPayload> Default for InMemoryStore<P> {
    fn default() -> Self {
        Self { logs: DashMap::new() }
    }
}

impl<P: EventPayload> InMemoryStore<P> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<P: EventPayload> EventStore<P> for InMemoryStore<P> {
    async fn apply(
        &self,
        log_id: &str,
        event: &mut Event<P>,
        expected_last_event_id: Option<&str>,
    ) -> DendriteResult<()> {
        let event_id = event
            .event_id
            .clone()
            .expect("Aggregate::apply must stamp event_id before calling the store");

        let mut log = self.logs.entry(log_id.to_string()).or_default();

        if let Some(last) = &log.last_event {
            if event_id.as_str() <= last.as_str() {
                return Err(DendriteError::NonMonotonicEventId {
                    log_id: log_id.to_string(),
                    last_event_id: last.clone(),
                    new_event_id: event_id,
                });
            }
        }

        if log.last_event.as_deref() != expected_last_event_id {
            return Err(DendriteError::concurrency_violation(
                log_id,
                expected_last_event_id,
                "ConditionalCheckFailed",
                format!(
                    "log's last_event is {:?}, writer expected {:?}",
                    log.last_event, expected_last_event_id
                ),
            ));
        }

        log.events.push(event.clone());
        log.last_event = Some(event_id);
        Ok(())
    }

    async fn get_log(&self, log_id: &str) -> DendriteResult<Vec<Event<P>>> {
        Ok(self
            .logs
            .get(log_id)
            .map(|log| log.events.clone())
            .unwrap_or_default())
    }

    async fn get_log_from(
        &self,
        log_id: &str,
        starting_point: StartingPoint,
    ) -> DendriteResult<Vec<Event<P>>> {
        let events = self.get_log(log_id).await?;
        Ok(match starting_point {
            StartingPoint::Timestamp(at) => events
                .into_iter()
                .filter(|e| e.applied_time.map(|t| t >= at).unwrap_or(false))
                .collect(),
            StartingPoint::AfterEvent(after_id) => events
                .into_iter()
                .filter(|e| e.event_id.as_deref() > Some(after_id.as_str()))
                .collect(),
        })
    }
}
