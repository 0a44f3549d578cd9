use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use futures::future::BoxFuture;
use strata_proto::{decode_position, encode_position, Continuation, FlatMapPosition};

use super::{BoxCursor, Cursor, CursorResult, CursorTail, InFlight, NoNextReason};
use crate::{error::CursorError, task::Executor};

/// Opens the inner cursor of one outer value, resuming it from the given continuation
pub type OpenInnerFn<T, V> = Arc<dyn Fn(T, Continuation) -> BoxFuture<'static, Result<BoxCursor<V>, CursorError>> + Send + Sync>;

/// Derives the reconstruction key of an outer value
pub type CheckValueFn<T> = Arc<dyn Fn(&T) -> Vec<u8> + Send + Sync>;

struct Opening<V> {
    cursor: InFlight<BoxCursor<V>>,
    prior_outer: Continuation,
    check: Option<Vec<u8>>,
}

struct Draining<V> {
    cursor: BoxCursor<V>,
    prior_outer: Continuation,
    check: Option<Vec<u8>>,
}

/// For each outer value, opens an inner cursor and drains it before moving
/// on, while up to `depth` following inner cursors are already being opened.
///
/// The continuation records the outer continuation from before the current
/// outer value, that value's check bytes and the inner continuation. On
/// resume, if the first outer value's check bytes differ from the recorded
/// ones, its inner cursor restarts from the beginning.
pub struct FlatMapPipelinedCursor<T, V> {
    outer: BoxCursor<T>,
    open_inner: OpenInnerFn<T, V>,
    check_value: Option<CheckValueFn<T>>,
    depth: usize,
    executor: Executor,
    opening: VecDeque<Opening<V>>,
    current: Option<Draining<V>>,
    resume: Option<(Option<Vec<u8>>, Continuation)>,
    last_outer: Continuation,
    outer_stop: Option<(NoNextReason, Continuation)>,
    tail: CursorTail,
}

impl<T, V> FlatMapPipelinedCursor<T, V>
where
    T: Send + 'static,
    V: Send + 'static,
{
    /// A `depth` of 0 runs as 1: the next inner cursor opens only once the
    /// current one is drained.
    pub fn new(
        outer: impl FnOnce(Continuation) -> Result<BoxCursor<T>, CursorError>,
        open_inner: OpenInnerFn<T, V>,
        check_value: Option<CheckValueFn<T>>,
        continuation: &Continuation,
        depth: usize,
    ) -> Result<Self, CursorError> {
        let (outer_continuation, resume) = match continuation {
            Continuation::End => (Continuation::End, None),
            _ => match decode_position::<FlatMapPosition>(continuation).map_err(CursorError::invalid_continuation)? {
                Some(position) => {
                    let outer = position.outer().map_err(CursorError::invalid_continuation)?;
                    let inner = position.inner().map_err(CursorError::invalid_continuation)?;
                    (outer, Some((position.check, inner)))
                }
                None => (Continuation::Start, None),
            },
        };
        let mut tail = CursorTail::Open;
        if outer_continuation.is_end() {
            tail = CursorTail::Done(NoNextReason::SourceExhausted, Continuation::End);
        }
        let outer = outer(outer_continuation.clone())?;
        let executor = outer.executor().clone();
        Ok(Self {
            outer,
            open_inner,
            check_value,
            depth: depth.max(1),
            executor,
            opening: VecDeque::new(),
            current: None,
            resume,
            last_outer: outer_continuation,
            outer_stop: None,
            tail,
        })
    }

    fn position(prior_outer: &Continuation, check: &Option<Vec<u8>>, inner: &Continuation) -> Result<Continuation, CursorError> {
        encode_position(&FlatMapPosition::new(prior_outer, check.clone(), inner)).map_err(CursorError::failure)
    }

    async fn fill(&mut self) -> Result<(), CursorError> {
        while self.opening.len() < self.depth && self.outer_stop.is_none() {
            match self.outer.next().await? {
                CursorResult::Next { value, continuation } => {
                    let prior_outer = std::mem::replace(&mut self.last_outer, continuation);
                    let check = self.check_value.as_ref().map(|f| f(&value));
                    let inner_continuation = match self.resume.take() {
                        Some((recorded, inner)) if self.check_value.is_none() || recorded == check => inner,
                        Some((recorded, _)) => {
                            if recorded.is_some() && check.is_some() {
                                tracing::debug!("outer value changed since the continuation was taken, restarting inner cursor");
                            }
                            Continuation::Start
                        }
                        None => Continuation::Start,
                    };
                    let cursor = InFlight::start(&self.executor, self.depth, (self.open_inner)(value, inner_continuation));
                    self.opening.push_back(Opening { cursor, prior_outer, check });
                }
                CursorResult::Exhausted { reason, continuation } => self.outer_stop = Some((reason, continuation)),
            }
        }
        Ok(())
    }

    async fn advance(&mut self) -> Result<CursorResult<V>, CursorError> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.cursor.next().await? {
                    CursorResult::Next { value, continuation } => {
                        let continuation = Self::position(&current.prior_outer, &current.check, &continuation)?;
                        return Ok(CursorResult::next(value, continuation));
                    }
                    CursorResult::Exhausted { reason, continuation } if reason.is_limit_reached() => {
                        let continuation = Self::position(&current.prior_outer, &current.check, &continuation)?;
                        return Ok(CursorResult::stopped(reason, continuation));
                    }
                    CursorResult::Exhausted { .. } => {
                        current.cursor.close();
                        self.current = None;
                    }
                }
            }

            self.fill().await?;
            match self.opening.pop_front() {
                Some(Opening { cursor, prior_outer, check }) => {
                    self.current = Some(Draining { cursor: cursor.join().await?, prior_outer, check });
                }
                None => {
                    return Ok(match &self.outer_stop {
                        Some((reason, continuation)) if reason.is_limit_reached() => {
                            CursorResult::stopped(*reason, Self::position(continuation, &None, &Continuation::Start)?)
                        }
                        _ => CursorResult::exhausted(),
                    });
                }
            }
        }
    }

    fn abandon(&mut self) {
        for opening in self.opening.drain(..) {
            opening.cursor.abort();
        }
        if let Some(mut current) = self.current.take() {
            current.cursor.close();
        }
    }
}

#[async_trait]
impl<T, V> Cursor<V> for FlatMapPipelinedCursor<T, V>
where
    T: Send + 'static,
    V: Send + 'static,
{
    async fn next(&mut self) -> Result<CursorResult<V>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = self.advance().await;
        if result.is_err() {
            self.abandon();
        }
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.abandon();
        self.outer.close();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}
