use strata_proto::{Continuation, Tuple};

use super::KeyFn;
use crate::{
    cursor::{BoxCursor, CursorResult, NoNextReason},
    error::CursorError,
};

pub(super) struct Front<T> {
    pub value: T,
    pub key: Tuple,
    continuation: Continuation,
}

/// One input of a merge with its read-ahead front element.
///
/// `continuation` always points after the last element the merge consumed
/// from this leg, so an unconsumed front is read again on resume.
pub(super) struct Leg<T> {
    cursor: BoxCursor<T>,
    pub front: Option<Front<T>>,
    pub stop: Option<NoNextReason>,
    pub continuation: Continuation,
}

impl<T: Send + 'static> Leg<T> {
    pub fn new(cursor: BoxCursor<T>, continuation: Continuation) -> Self { Self { cursor, front: None, stop: None, continuation } }

    /// A leg that was already exhausted when the continuation was taken
    pub fn finished(cursor: BoxCursor<T>) -> Self {
        Self { cursor, front: None, stop: Some(NoNextReason::SourceExhausted), continuation: Continuation::End }
    }

    pub fn needs_fill(&self) -> bool { self.front.is_none() && self.stop.is_none() }

    pub async fn fill(&mut self, key: &KeyFn<T>) -> Result<(), CursorError> {
        if !self.needs_fill() {
            return Ok(());
        }
        match self.cursor.next().await? {
            CursorResult::Next { value, continuation } => {
                let key = key(&value)?;
                self.front = Some(Front { value, key, continuation });
            }
            CursorResult::Exhausted { reason, continuation } => {
                self.stop = Some(reason);
                self.continuation = continuation;
            }
        }
        Ok(())
    }

    pub fn front_key(&self) -> Option<&Tuple> { self.front.as_ref().map(|front| &front.key) }

    /// Take the front element, moving this leg's continuation past it
    pub fn consume(&mut self) -> Option<T> {
        let front = self.front.take()?;
        self.continuation = front.continuation;
        Some(front.value)
    }

    /// Stopped for a limit rather than running dry
    pub fn limit_reason(&self) -> Option<NoNextReason> { self.stop.filter(|reason| reason.is_limit_reached()) }

    pub fn is_exhausted(&self) -> bool { self.front.is_none() && self.stop.is_some_and(|reason| reason.is_source_exhausted()) }

    pub fn close(&mut self) {
        self.front = None;
        self.cursor.close();
    }
}
