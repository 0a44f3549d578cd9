use std::{marker::PhantomData, time::Instant};

use async_trait::async_trait;
use strata_proto::Continuation;

use super::{Cursor, CursorResult, CursorTail, NoNextReason};
use crate::{error::CursorError, scan::ScanProperties, task::Executor};

/// Applies skip, the returned-row limit and the cooperative time limit.
///
/// The time limit never stops a page before its first row. When a limit
/// stops the cursor, the continuation is that of the last row handed out
/// (or skipped), so resuming continues right after it.
pub struct LimitedCursor<C, T> {
    inner: C,
    skip_remaining: usize,
    limit: Option<usize>,
    time_limit: Option<std::time::Duration>,
    started: Instant,
    returned: usize,
    last_continuation: Continuation,
    tail: CursorTail,
    _item: PhantomData<fn(T)>,
}

impl<C, T> LimitedCursor<C, T> {
    pub fn new(inner: C, props: &ScanProperties, continuation: &Continuation) -> Self {
        let skip_remaining = if continuation.is_start() { props.skip } else { 0 };
        Self {
            inner,
            skip_remaining,
            limit: props.limit,
            time_limit: props.time_limit,
            started: Instant::now(),
            returned: 0,
            last_continuation: continuation.clone(),
            tail: CursorTail::Open,
            _item: PhantomData,
        }
    }

    fn check_limits(&self) -> Option<NoNextReason> {
        if self.limit.is_some_and(|limit| self.returned >= limit) {
            return Some(NoNextReason::ReturnLimitReached);
        }
        if self.returned > 0 && self.time_limit.is_some_and(|limit| self.started.elapsed() >= limit) {
            return Some(NoNextReason::TimeLimitReached);
        }
        None
    }
}

#[async_trait]
impl<C, T> Cursor<T> for LimitedCursor<C, T>
where
    C: Cursor<T>,
    T: Send,
{
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        if let Some(reason) = self.check_limits() {
            tracing::debug!(%reason, returned = self.returned, "stopping scan");
            self.inner.close();
            let result = Ok(CursorResult::stopped(reason, self.last_continuation.clone()));
            return self.tail.observe(result);
        }
        loop {
            let result = match self.inner.next().await {
                Ok(CursorResult::Next { value, continuation }) => {
                    self.last_continuation = continuation.clone();
                    if self.skip_remaining > 0 {
                        self.skip_remaining -= 1;
                        continue;
                    }
                    self.returned += 1;
                    Ok(CursorResult::next(value, continuation))
                }
                other => other,
            };
            return self.tail.observe(result);
        }
    }

    fn close(&mut self) {
        self.inner.close();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { self.inner.executor() }
}
