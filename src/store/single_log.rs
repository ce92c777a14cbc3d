//! Single-log event store
//!
//! The degenerate test double from the source's `single_log_event_store.py`:
//! every `log_id` is ignored and all events land in one shared sequence.
//! Used by the source's concurrency test harness to make several aggregates
//! race over what is, from the store's point of view, a single log — here
//! kept for the same purpose (see `tests/concurrency.rs`).

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{DendriteError, DendriteResult};
use crate::event::{Event, EventPayload};

use super::{EventStore, StartingPoint};

struct Inner<P: EventPayload> {
    events: Vec<Event<P>>,
    last_event: Option<String>,
}

/// Single shared log, `log_id` argument ignored on every call.
pub struct SingleLogStore<P: EventPayload> {
    inner: Mutex<Inner<P>>,
}

impl<P: EventPayload> Default for SingleLogStore<P> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                last_event: None,
            }),
        }
    }
}

impl<P: EventPayload> SingleLogStore<P> {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<P: EventPayload> EventStore<P> for SingleLogStore<P> {
    async fn apply(
        &self,
        _log_id: &str,
        event: &mut Event<P>,
        expected_last_event_id: Option<&str>,
    ) -> DendriteResult<()> {
        let event_id = event
            .event_id
            .clone()
            .expect("Aggregate::apply must stamp event_id before calling the store");

        let mut inner = self.inner.lock().await;

        if let Some(last) = &inner.last_event {
            if event_id.as_str() <= last.as_str() {
                return Err(DendriteError::NonMonotonicEventId {
                    log_id: "single-log".to_string(),
                    last_event_id: last.clone(),
                    new_event_id: event_id,
                });
            }
        }

        if inner.last_event.as_deref() != expected_last_event_id {
            return Err(DendriteError::concurrency_violation(
                "single-log",
                expected_last_event_id,
                "ConditionalCheckFailed",
                format!(
                    "shared log's last_event is {:?}, writer expected {:?}",
                    inner.last_event, expected_last_event_id
                ),
            ));
        }

        inner.events.push(event.clone());
        inner.last_event = Some(event_id);
        Ok(())
    }

    async fn get_log(&self, _log_id: &str) -> DendriteResult<Vec<Event<P>>> {
        Ok(self.inner.lock().await.events.clone())
    }

    async fn get_log_from(
        &self,
        _log_id: &str,
        _starting_point: StartingPoint,
    ) -> DendriteResult<Vec<Event<P>>> {
        Err(DendriteError::Unsupported(
            "SingleLogStore does not support get_log_from",
        ))
    }
}
