//! The cursor contract: pull-based, asynchronous and resumable iteration.
//!
//! A cursor hands out `CursorResult`s until it reports why it has no next
//! value. Every result carries a `Continuation` from which an equivalent
//! cursor (same plan shape) picks up exactly after that result.

mod adapters;
mod flat_map;
mod kv;
mod limit;
mod list;
mod pipeline;

pub use adapters::{FilterCursor, MapCursor, MapResultCursor, TryMapCursor};
pub use flat_map::{CheckValueFn, FlatMapPipelinedCursor, OpenInnerFn};
pub use kv::{KeyValue, KeyValueCursor};
pub use limit::LimitedCursor;
pub use list::{EmptyCursor, FutureCursor, ListCursor};
pub use pipeline::MapPipelinedCursor;
pub(crate) use pipeline::InFlight;

use async_trait::async_trait;
use futures::future::BoxFuture;
use strata_proto::Continuation;

use crate::{error::CursorError, scan::ScanProperties, task::Executor};

/// Why a cursor has no next value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoNextReason {
    SourceExhausted,
    ReturnLimitReached,
    TimeLimitReached,
    ScanLimitReached,
}

impl NoNextReason {
    pub fn is_source_exhausted(&self) -> bool { matches!(self, NoNextReason::SourceExhausted) }

    /// The cursor stopped early and can be resumed from its continuation
    pub fn is_limit_reached(&self) -> bool { !self.is_source_exhausted() }

    /// Limits imposed from outside the plan (as opposed to the returned-row limit)
    pub fn is_out_of_band(&self) -> bool { matches!(self, NoNextReason::TimeLimitReached | NoNextReason::ScanLimitReached) }
}

impl std::fmt::Display for NoNextReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoNextReason::SourceExhausted => write!(f, "source exhausted"),
            NoNextReason::ReturnLimitReached => write!(f, "return limit reached"),
            NoNextReason::TimeLimitReached => write!(f, "time limit reached"),
            NoNextReason::ScanLimitReached => write!(f, "scan limit reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorResult<T> {
    Next { value: T, continuation: Continuation },
    Exhausted { reason: NoNextReason, continuation: Continuation },
}

impl<T> CursorResult<T> {
    pub fn next(value: T, continuation: Continuation) -> Self { CursorResult::Next { value, continuation } }

    /// Terminal result of a source that ran dry
    pub fn exhausted() -> Self { CursorResult::Exhausted { reason: NoNextReason::SourceExhausted, continuation: Continuation::End } }

    pub fn stopped(reason: NoNextReason, continuation: Continuation) -> Self {
        if reason.is_source_exhausted() {
            Self::exhausted()
        } else {
            CursorResult::Exhausted { reason, continuation }
        }
    }

    pub fn has_next(&self) -> bool { matches!(self, CursorResult::Next { .. }) }

    pub fn continuation(&self) -> &Continuation {
        match self {
            CursorResult::Next { continuation, .. } | CursorResult::Exhausted { continuation, .. } => continuation,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            CursorResult::Next { value, .. } => Some(value),
            CursorResult::Exhausted { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            CursorResult::Next { value, .. } => Some(value),
            CursorResult::Exhausted { .. } => None,
        }
    }

    pub fn no_next_reason(&self) -> Option<NoNextReason> {
        match self {
            CursorResult::Next { .. } => None,
            CursorResult::Exhausted { reason, .. } => Some(*reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CursorResult<U> {
        match self {
            CursorResult::Next { value, continuation } => CursorResult::Next { value: f(value), continuation },
            CursorResult::Exhausted { reason, continuation } => CursorResult::Exhausted { reason, continuation },
        }
    }

    pub fn with_continuation(self, continuation: Continuation) -> Self {
        match self {
            CursorResult::Next { value, .. } => CursorResult::Next { value, continuation },
            CursorResult::Exhausted { reason, .. } => CursorResult::Exhausted { reason, continuation },
        }
    }
}

/// An asynchronous, resumable sequence of `T`.
///
/// `next` may be called repeatedly; once an `Exhausted` result is returned,
/// every further call returns that same result. After a failure the cursor
/// is unusable and only `close` may be called. `close` is idempotent and
/// abandons any in-flight work without waiting for it.
#[async_trait]
pub trait Cursor<T: Send>: Send {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError>;

    fn close(&mut self);

    fn executor(&self) -> &Executor;
}

pub type BoxCursor<T> = Box<dyn Cursor<T>>;

#[async_trait]
impl<T: Send, C: Cursor<T> + ?Sized> Cursor<T> for Box<C> {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> { (**self).next().await }

    fn close(&mut self) { (**self).close() }

    fn executor(&self) -> &Executor { (**self).executor() }
}

/// Tracks the terminal state of a cursor so that its tail stays idempotent.
#[derive(Debug, Clone, Default)]
pub enum CursorTail {
    #[default]
    Open,
    Done(NoNextReason, Continuation),
    Failed,
    Closed,
}

impl CursorTail {
    /// The result to return without touching the source, if the cursor is no longer open
    pub fn guard<T>(&self) -> Option<Result<CursorResult<T>, CursorError>> {
        match self {
            CursorTail::Open => None,
            CursorTail::Done(reason, continuation) => Some(Ok(CursorResult::Exhausted { reason: *reason, continuation: continuation.clone() })),
            CursorTail::Failed => Some(Err(CursorError::Unusable)),
            CursorTail::Closed => Some(Err(CursorError::Closed)),
        }
    }

    /// Record the outcome of a `next` call
    pub fn observe<T>(&mut self, result: Result<CursorResult<T>, CursorError>) -> Result<CursorResult<T>, CursorError> {
        match &result {
            Ok(CursorResult::Exhausted { reason, continuation }) => *self = CursorTail::Done(*reason, continuation.clone()),
            Err(_) => *self = CursorTail::Failed,
            Ok(CursorResult::Next { .. }) => {}
        }
        result
    }

    pub fn close(&mut self) { *self = CursorTail::Closed }

    pub fn is_open(&self) -> bool { matches!(self, CursorTail::Open) }
}

/// Combinators available on every sized cursor
pub trait CursorExt<T: Send + 'static>: Cursor<T> + Sized + 'static {
    fn boxed(self) -> BoxCursor<T> { Box::new(self) }

    fn map<U, F>(self, f: F) -> MapCursor<Self, F, T>
    where F: FnMut(T) -> U + Send {
        MapCursor::new(self, f)
    }

    fn try_map<U, F>(self, f: F) -> TryMapCursor<Self, F, T>
    where F: FnMut(T) -> Result<U, CursorError> + Send {
        TryMapCursor::new(self, f)
    }

    fn filter<F>(self, predicate: F) -> FilterCursor<Self, F>
    where F: FnMut(&T) -> bool + Send {
        FilterCursor::new(self, predicate)
    }

    fn map_result<U, F>(self, f: F) -> MapResultCursor<Self, F, T>
    where F: FnMut(CursorResult<T>) -> CursorResult<U> + Send {
        MapResultCursor::new(self, f)
    }

    /// Apply `skip`, the returned-row limit and the time limit of `props`.
    /// `continuation` is the one this cursor was opened with.
    fn skip_then_limit(self, props: &ScanProperties, continuation: &Continuation) -> LimitedCursor<Self, T> {
        LimitedCursor::new(self, props, continuation)
    }

    /// Apply `f` with up to `depth` applications in flight; 0 runs as 1
    fn map_pipelined<U, F>(self, f: F, depth: usize) -> MapPipelinedCursor<Self, T, U>
    where
        U: Send + 'static,
        F: Fn(T) -> BoxFuture<'static, Result<U, CursorError>> + Send + Sync + 'static,
    {
        MapPipelinedCursor::new(self, f, depth)
    }

    /// Drain the cursor, returning every value and the terminal result
    fn collect_all(mut self) -> BoxFuture<'static, Result<(Vec<T>, NoNextReason, Continuation), CursorError>> {
        Box::pin(async move {
            let mut values = Vec::new();
            loop {
                match self.next().await {
                    Ok(CursorResult::Next { value, .. }) => values.push(value),
                    Ok(CursorResult::Exhausted { reason, continuation }) => {
                        self.close();
                        return Ok((values, reason, continuation));
                    }
                    Err(err) => {
                        self.close();
                        return Err(err);
                    }
                }
            }
        })
    }
}

impl<T: Send + 'static, C: Cursor<T> + Sized + 'static> CursorExt<T> for C {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_with_source_exhausted_is_end() {
        let result: CursorResult<()> = CursorResult::stopped(NoNextReason::SourceExhausted, Continuation::resume(vec![1]));
        assert_eq!(result.continuation(), &Continuation::End);
        let result: CursorResult<()> = CursorResult::stopped(NoNextReason::ScanLimitReached, Continuation::resume(vec![1]));
        assert_eq!(result.continuation(), &Continuation::resume(vec![1]));
        assert!(result.no_next_reason().unwrap().is_out_of_band());
    }

    #[test]
    fn test_tail_is_idempotent() {
        let mut tail = CursorTail::default();
        assert!(tail.guard::<u8>().is_none());
        let _ = tail.observe::<u8>(Ok(CursorResult::exhausted()));
        for _ in 0..2 {
            let again = tail.guard::<u8>().unwrap().unwrap();
            assert_eq!(again.no_next_reason(), Some(NoNextReason::SourceExhausted));
        }
        let _ = tail.observe::<u8>(Err(CursorError::invalid_argument("boom")));
        assert!(matches!(tail.guard::<u8>(), Some(Err(CursorError::Unusable))));
        tail.close();
        assert!(matches!(tail.guard::<u8>(), Some(Err(CursorError::Closed))));
    }
}
