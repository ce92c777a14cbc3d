//! Event handler module
//!
//! `EventHandler` is a side-effect sink invoked after a successful `apply`.
//! The trait takes a batch today only because the source signature was
//! batch-shaped "to permit future batched projection" — the runtime always
//! calls it with a single-element batch.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DendriteResult;
use crate::event::{Event, EventPayload};

/// Side-effect sink invoked on `apply`. Never invoked during replay.
///
/// A failure propagates to the caller of `apply` -- the event is already
/// durable by the time handlers run, so a returned error means "persisted;
/// one or more projections may be stale," not "the write failed."
#[async_trait]
pub trait EventHandler<P: EventPayload>: Send + Sync {
    async fn handle_event(&self, events: &[Event<P>]) -> DendriteResult<()>;
}

/// Mapping `event_type -> [handler, ...]`, built once at factory
/// construction and immutable thereafter. Insertion order is preserved;
/// handlers for a given type run in registration order.
#[derive(Clone)]
pub struct HandlerRegistry<P: EventPayload> {
    handlers: std::collections::HashMap<&'static str, Vec<Arc<dyn EventHandler<P>>>>,
}

impl<P: EventPayload> Default for HandlerRegistry<P> {
    fn default() -> Self {
        Self {
            handlers: std::collections::HashMap::new(),
        }
    }
}

impl<P: EventPayload> HandlerRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `type_tag`, appended after any handlers
    /// already registered for that tag.
    pub fn register(mut self, type_tag: &'static str, handler: Arc<dyn EventHandler<P>>) -> Self {
        self.handlers.entry(type_tag).or_default().push(handler);
        self
    }

    /// Handlers registered for `type_tag`, in registration order.
    pub fn handlers_for(&self, type_tag: &str) -> &[Arc<dyn EventHandler<P>>] {
        self.handlers
            .get(type_tag)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Dispatch `event` to every handler registered for its type, in order.
    /// Stops and returns the first error a handler raises; handlers after
    /// it in registration order do not run.
    pub async fn dispatch(&self, event: &Event<P>) -> DendriteResult<()> {
        for handler in self.handlers_for(event.type_tag()) {
            handler.handle_event(std::slice::from_ref(event)).await?;
        }
        Ok(())
    }
}
