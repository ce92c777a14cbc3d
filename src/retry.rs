//! Retry module
//!
//! Generalizes the concurrency test harness's reload-then-reapply pattern
//! (`concurrency_ledger.py`'s `update_ledger`: catch the concurrency error,
//! `self.reload()`, re-apply) into a reusable policy instead of hand-rolled
//! try/except at every call site.

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DendriteResult;
use crate::event::Event;
use crate::store::EventStore;

/// Bounded reload-and-retry around a single `apply` call.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first, pre-conflict one. The source
    /// harness retries exactly once; `2` reproduces that behavior.
    pub max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        Self { max_attempts }
    }

    /// Apply the event produced by `make_event` to `aggregate`. On
    /// [`DendriteError::ConcurrencyViolation`], reload the aggregate from
    /// the store and re-apply a freshly constructed event, up to
    /// `max_attempts` times. Any other error, or a concurrency violation on
    /// the final attempt, is returned as-is.
    ///
    /// `make_event` is handed the aggregate's current state rather than
    /// capturing `aggregate` itself -- a command whose event embeds a
    /// snapshot value (e.g. a running balance) needs the *reloaded* state
    /// on retry, and a closure that instead captured `aggregate` by
    /// reference would alias the `&mut AggregateRoot` this method already
    /// holds.
    pub async fn apply_with_retry<A, S, F>(
        &self,
        aggregate: &mut AggregateRoot<A, S>,
        make_event: F,
    ) -> DendriteResult<()>
    where
        A: Aggregate,
        S: EventStore<A::Event>,
        F: Fn(&A) -> Event<A::Event>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let event = make_event(aggregate.state());
            match aggregate.apply(event).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_concurrency_violation() && attempt < self.max_attempts => {
                    aggregate.reload().await?;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
