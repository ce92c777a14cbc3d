//! Error handling module
//!
//! Centralized error type for the Dendrite runtime. The source implementation
//! raised three distinct exception shapes (`ConcurrencyViolationError`, a
//! `ValueError` on event-class resolution failure, and whatever the
//! underlying I/O layer produced); this folds them into one `thiserror` enum.

use thiserror::Error;

/// Runtime-wide `Result` alias.
pub type DendriteResult<T> = Result<T, DendriteError>;

/// Errors raised by the event store, aggregate, and factory.
#[derive(Debug, Error)]
pub enum DendriteError {
    /// The store's conditional write failed: another writer already
    /// advanced the log past the caller's `expected_last_event_id`.
    ///
    /// Recoverable by reload + re-apply (see [`crate::retry::RetryPolicy`]).
    #[error("concurrency violation on log {log_id}: {message}")]
    ConcurrencyViolation {
        log_id: String,
        message: String,
        code: String,
        reason: String,
    },

    /// A stored `event_type` tag did not match any variant the aggregate's
    /// event enum understands. Non-recoverable within this process.
    #[error("could not resolve event type {type_tag} for log {log_id}")]
    UnknownEventType { log_id: String, type_tag: String },

    /// An `apply` call was made with an `event_id` that is not strictly
    /// greater than the aggregate's last known `event_id`. This indicates a
    /// programmer error (e.g. reusing a stale aggregate instance) rather
    /// than a store-level conflict.
    #[error("event_id {new_event_id} is not greater than last applied {last_event_id} on log {log_id}")]
    NonMonotonicEventId {
        log_id: String,
        last_event_id: String,
        new_event_id: String,
    },

    /// The store does not implement this operation (e.g. `get_log_from` on
    /// a store that never supported it).
    #[error("operation not supported by this event store: {0}")]
    Unsupported(&'static str),

    /// Event payload (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A DynamoDB operation (transact-write, query, ...) failed for a
    /// reason other than a conditional-check failure -- throttling,
    /// transport, auth, etc. Kept as the SDK's own unified service error
    /// rather than stringified, so `Error::source()` still chains back to
    /// it, the way the teacher's `event_store/error.rs` keeps
    /// `Database(#[from] sqlx::Error)` instead of collapsing it to a string.
    #[error("dynamodb service error: {0}")]
    Dynamo(#[from] aws_sdk_dynamodb::Error),

    /// An event or DynamoDB item failed to convert to/from the service's
    /// attribute-value format.
    #[error("dynamodb item encoding error: {0}")]
    ItemEncoding(#[from] serde_dynamo::Error),

    /// A DynamoDB request (a `Put`/`Update`/`TransactWriteItem`, ...) failed
    /// to build, e.g. a malformed attribute value.
    #[error("dynamodb request build error: {0}")]
    RequestBuild(#[from] aws_sdk_dynamodb::error::BuildError),
}

impl DendriteError {
    pub fn concurrency_violation(
        log_id: impl Into<String>,
        expected_last_event_id: Option<&str>,
        code: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConcurrencyViolation {
            message: format!(
                "could not update log metadata because the last applied event id does not match the client's event id {:?}",
                expected_last_event_id
            ),
            log_id: log_id.into(),
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// True for the one semantically-rich, caller-recoverable signal.
    pub fn is_concurrency_violation(&self) -> bool {
        matches!(self, Self::ConcurrencyViolation { .. })
    }
}
