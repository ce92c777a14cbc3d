//! Event module
//!
//! An [`Event<P>`] is the envelope of control fields (`event_id`,
//! `created_time`, `applied_time`) wrapped around a domain payload `P`.
//! `P` is a per-aggregate, internally-tagged `enum` -- a sealed tagged
//! union, since the aggregate and its events ship together in this crate.
//! This replaces a dynamic class-from-type-name module-path resolution
//! with ordinary, compile-time-checked `serde` tagging: the store only
//! ever needs the tag string `P` already carries and `P`'s own
//! `Deserialize` impl.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Implemented by the payload enum of a single aggregate's events.
///
/// `type_tag`/`short_name` are computed once per call from a `match` over
/// the enum's variants — cheap, and never recomputed per access beyond
/// that single match. `type_tag` is the fully-qualified-type-name stand-in:
/// here, just the variant name, since there is no module-path reflection
/// to emulate.
pub trait EventPayload: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// Discriminator used as the event's `type_tag` in storage and as the
    /// serde-internal enum tag. Stable across refactors by convention: this
    /// is the contract `apply`/`get_log` round-tripping relies on.
    fn type_tag(&self) -> &'static str;

    /// Human-readable short name used to build the `event_id`: the
    /// concrete event name with any trailing `Event` token stripped. By
    /// convention this equals `type_tag` unless the variant name itself
    /// carries an `Event` suffix, which [`derive_short_name`] strips.
    fn short_name(&self) -> &'static str {
        derive_short_name(self.type_tag())
    }
}

/// An immutable domain fact: control fields plus a payload.
///
/// Invariants: `event_id` is immutable once set; `created_time <=
/// applied_time`; `short_name` is a pure function of the payload; within a
/// log, `event_id`s are unique and strictly increasing under lexicographic
/// order.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct Event<P: EventPayload> {
    pub event_id: Option<String>,
    pub created_time: DateTime<Utc>,
    pub applied_time: Option<DateTime<Utc>>,
    /// Flattened so each payload field (plus the payload enum's own
    /// `#[serde(tag = "event_type")]` discriminant) lands at the top level
    /// of the serialized event alongside the control fields above, rather
    /// than nested under a `"payload"` map -- matching spec.md §4.3/§6's row
    /// model ("attributes `type_fqn`, `created_time`, `applied_time`, plus
    /// payload fields").
    #[serde(flatten)]
    pub payload: P,
}

impl<P: EventPayload> Event<P> {
    /// Construct a new, not-yet-persisted event. `created_time` is set to
    /// `now(UTC)` at construction; `event_id` and `applied_time` remain
    /// unset until the store accepts the write.
    pub fn new(payload: P) -> Self {
        Self {
            event_id: None,
            created_time: Utc::now(),
            applied_time: None,
            payload,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.payload.type_tag()
    }

    pub fn short_name(&self) -> &'static str {
        self.payload.short_name()
    }
}

/// `strftime("%Y%m%d%H%M%S") + microseconds(6 digits) + "_" + short_name`.
/// Full microsecond precision is kept rather than trimmed to milliseconds,
/// since trimming loses the tie-breaking precision the concurrency
/// protocol needs for same-log bursts.
///
/// Width and padding are fixed so lexicographic sort yields chronological
/// order; this is the sort key every reader relies on.
pub fn format_event_id(at: DateTime<Utc>, short_name: &str) -> String {
    format!("{}{:06}_{}", at.format("%Y%m%d%H%M%S"), at.timestamp_subsec_micros(), short_name)
}

/// `short_name` derivation rule: the concrete type's name with a trailing
/// `Event` token stripped, case sensitive. Exposed as a free function so
/// both trait impls and tests can exercise the exact same rule without
/// duplicating it.
pub fn derive_short_name(type_name: &str) -> &str {
    type_name.strip_suffix("Event").unwrap_or(type_name)
}
