//! Event store module
//!
//! The `EventStore` contract and its three realizations: in-memory test
//! doubles ([`memory`], [`single_log`]) and the durable partitioned-KV
//! store ([`dynamo`]).

pub mod dynamo;
pub mod memory;
pub mod single_log;

use chrono::{DateTime, Utc};

use crate::error::DendriteResult;
use crate::event::{Event, EventPayload};

/// Either bound accepted by `get_log_from`: a timestamp (`applied_time >=
/// starting_point`) or an event (`event_id > starting_point.event_id`).
#[derive(Debug, Clone)]
pub enum StartingPoint {
    Timestamp(DateTime<Utc>),
    AfterEvent(String),
}

/// Append-with-concurrency-tag + full-log read + range read, over a
/// per-aggregate event payload `P`. All three operations may suspend on I/O.
#[async_trait::async_trait]
pub trait EventStore<P: EventPayload>: Send + Sync {
    /// Append `event` to `log_id` atomically with a conditional update of
    /// the log's `last_event` metadata. Preconditions:
    ///
    /// - `event.event_id` is set and strictly greater (lexicographically)
    ///   than the log's current `last_event`.
    /// - If `expected_last_event_id` is `None`, the log's metadata must not
    ///   yet exist; the call creates it.
    /// - If `expected_last_event_id` is `Some`, the stored `last_event`
    ///   must equal it.
    ///
    /// On success, `event.applied_time` is set before the write and both
    /// the event and metadata are durable. On a metadata mismatch, fails
    /// with [`crate::error::DendriteError::ConcurrencyViolation`].
    async fn apply(
        &self,
        log_id: &str,
        event: &mut Event<P>,
        expected_last_event_id: Option<&str>,
    ) -> DendriteResult<()>;

    /// All events for `log_id` in ascending `event_id` order. Metadata rows
    /// are filtered out. An empty log returns an empty sequence, never an
    /// error.
    async fn get_log(&self, log_id: &str) -> DendriteResult<Vec<Event<P>>>;

    /// Events at or after `starting_point`. Optional: stores may return
    /// [`crate::error::DendriteError::Unsupported`].
    async fn get_log_from(
        &self,
        log_id: &str,
        starting_point: StartingPoint,
    ) -> DendriteResult<Vec<Event<P>>>;
}
