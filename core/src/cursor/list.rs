use async_trait::async_trait;
use futures::future::BoxFuture;
use strata_proto::{decode_position, encode_position, Continuation, ListPosition};

use super::{Cursor, CursorResult, CursorTail};
use crate::{error::CursorError, task::Executor};

/// A cursor over an in-memory list. The continuation is the index of the next element.
pub struct ListCursor<T> {
    items: std::vec::IntoIter<T>,
    next_index: u64,
    executor: Executor,
    tail: CursorTail,
}

impl<T: Send> ListCursor<T> {
    pub fn new(items: Vec<T>, continuation: &Continuation) -> Result<Self, CursorError> {
        let start = match continuation {
            Continuation::End => items.len() as u64,
            _ => decode_position::<ListPosition>(continuation).map_err(CursorError::invalid_continuation)?.map(|p| p.next_index).unwrap_or(0),
        };
        let mut iter = items.into_iter();
        if start > 0 {
            iter.nth(start as usize - 1);
        }
        Ok(Self { items: iter, next_index: start, executor: Executor::current(), tail: CursorTail::Open })
    }

    /// A list cursor starting at the beginning
    pub fn from_vec(items: Vec<T>) -> Self {
        Self { items: items.into_iter(), next_index: 0, executor: Executor::current(), tail: CursorTail::Open }
    }
}

#[async_trait]
impl<T: Send> Cursor<T> for ListCursor<T> {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = match self.items.next() {
            Some(value) => {
                self.next_index += 1;
                encode_position(&ListPosition { next_index: self.next_index }).map(|c| CursorResult::next(value, c)).map_err(CursorError::failure)
            }
            None => Ok(CursorResult::exhausted()),
        };
        self.tail.observe(result)
    }

    fn close(&mut self) { self.tail.close() }

    fn executor(&self) -> &Executor { &self.executor }
}

/// A cursor with no elements
pub struct EmptyCursor {
    executor: Executor,
    tail: CursorTail,
}

impl EmptyCursor {
    pub fn new() -> Self { Self { executor: Executor::current(), tail: CursorTail::Open } }
}

impl Default for EmptyCursor {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl<T: Send> Cursor<T> for EmptyCursor {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        self.tail.observe(Ok(CursorResult::exhausted()))
    }

    fn close(&mut self) { self.tail.close() }

    fn executor(&self) -> &Executor { &self.executor }
}

/// A list computed asynchronously on first `next`, then iterated like a `ListCursor`
pub struct FutureCursor<T> {
    pending: Option<BoxFuture<'static, Result<Vec<T>, CursorError>>>,
    continuation: Continuation,
    list: Option<ListCursor<T>>,
    executor: Executor,
    tail: CursorTail,
}

impl<T: Send> FutureCursor<T> {
    pub fn new(future: BoxFuture<'static, Result<Vec<T>, CursorError>>, continuation: &Continuation) -> Self {
        Self { pending: Some(future), continuation: continuation.clone(), list: None, executor: Executor::current(), tail: CursorTail::Open }
    }
}

#[async_trait]
impl<T: Send> Cursor<T> for FutureCursor<T> {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        if let Some(pending) = self.pending.take() {
            let result = match pending.await {
                Ok(items) => ListCursor::new(items, &self.continuation),
                Err(err) => Err(err),
            };
            match result {
                Ok(list) => self.list = Some(list),
                Err(err) => return self.tail.observe(Err(err)),
            }
        }
        let result = match self.list.as_mut() {
            Some(list) => list.next().await,
            None => Ok(CursorResult::exhausted()),
        };
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.pending = None;
        if let Some(list) = self.list.as_mut() {
            list.close();
        }
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}
