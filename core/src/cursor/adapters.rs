use std::marker::PhantomData;

use async_trait::async_trait;

use super::{Cursor, CursorResult, CursorTail};
use crate::{error::CursorError, task::Executor};

/// Transforms each value; continuations pass through unchanged
pub struct MapCursor<C, F, T> {
    inner: C,
    f: F,
    _item: PhantomData<fn(T)>,
}

impl<C, F, T> MapCursor<C, F, T> {
    pub fn new(inner: C, f: F) -> Self { Self { inner, f, _item: PhantomData } }
}

#[async_trait]
impl<C, F, T, U> Cursor<U> for MapCursor<C, F, T>
where
    C: Cursor<T>,
    F: FnMut(T) -> U + Send,
    T: Send,
    U: Send,
{
    async fn next(&mut self) -> Result<CursorResult<U>, CursorError> { Ok(self.inner.next().await?.map(&mut self.f)) }

    fn close(&mut self) { self.inner.close() }

    fn executor(&self) -> &Executor { self.inner.executor() }
}

/// Like `MapCursor`, but the transformation may fail the cursor
pub struct TryMapCursor<C, F, T> {
    inner: C,
    f: F,
    tail: CursorTail,
    _item: PhantomData<fn(T)>,
}

impl<C, F, T> TryMapCursor<C, F, T> {
    pub fn new(inner: C, f: F) -> Self { Self { inner, f, tail: CursorTail::Open, _item: PhantomData } }
}

#[async_trait]
impl<C, F, T, U> Cursor<U> for TryMapCursor<C, F, T>
where
    C: Cursor<T>,
    F: FnMut(T) -> Result<U, CursorError> + Send,
    T: Send,
    U: Send,
{
    async fn next(&mut self) -> Result<CursorResult<U>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = match self.inner.next().await {
            Ok(CursorResult::Next { value, continuation }) => (self.f)(value).map(|value| CursorResult::next(value, continuation)),
            Ok(CursorResult::Exhausted { reason, continuation }) => Ok(CursorResult::Exhausted { reason, continuation }),
            Err(err) => Err(err),
        };
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.inner.close();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { self.inner.executor() }
}

/// Drops values for which the predicate is false
pub struct FilterCursor<C, F> {
    inner: C,
    predicate: F,
}

impl<C, F> FilterCursor<C, F> {
    pub fn new(inner: C, predicate: F) -> Self { Self { inner, predicate } }
}

#[async_trait]
impl<C, F, T> Cursor<T> for FilterCursor<C, F>
where
    C: Cursor<T>,
    F: FnMut(&T) -> bool + Send,
    T: Send,
{
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        loop {
            match self.inner.next().await? {
                CursorResult::Next { value, .. } if !(self.predicate)(&value) => continue,
                result => return Ok(result),
            }
        }
    }

    fn close(&mut self) { self.inner.close() }

    fn executor(&self) -> &Executor { self.inner.executor() }
}

/// Rewrites whole results, including their continuations
pub struct MapResultCursor<C, F, T> {
    inner: C,
    f: F,
    _item: PhantomData<fn(T)>,
}

impl<C, F, T> MapResultCursor<C, F, T> {
    pub fn new(inner: C, f: F) -> Self { Self { inner, f, _item: PhantomData } }
}

#[async_trait]
impl<C, F, T, U> Cursor<U> for MapResultCursor<C, F, T>
where
    C: Cursor<T>,
    F: FnMut(CursorResult<T>) -> CursorResult<U> + Send,
    T: Send,
    U: Send,
{
    async fn next(&mut self) -> Result<CursorResult<U>, CursorError> { Ok((self.f)(self.inner.next().await?)) }

    fn close(&mut self) { self.inner.close() }

    fn executor(&self) -> &Executor { self.inner.executor() }
}
