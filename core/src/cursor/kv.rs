use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use strata_proto::{decode_position, encode_position, Continuation, KeyPosition, KeyRange};

use super::{Cursor, CursorResult, CursorTail, NoNextReason};
use crate::{error::CursorError, scan::ExecuteState, store::KeyValueStore, task::Executor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Batched range iteration over a `KeyValueStore`.
///
/// The continuation is the last key returned; resuming starts strictly
/// after it (or strictly before it, in reverse). Each returned pair is
/// charged against the execution's scan budget, except that the first pair
/// a cursor returns always passes.
pub struct KeyValueCursor {
    store: Arc<dyn KeyValueStore>,
    range: KeyRange,
    reverse: bool,
    batch_size: usize,
    buffer: VecDeque<(Vec<u8>, Vec<u8>)>,
    source_done: bool,
    last_key: Option<Vec<u8>>,
    continuation: Continuation,
    state: ExecuteState,
    initial_pass: bool,
    executor: Executor,
    tail: CursorTail,
}

impl KeyValueCursor {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        range: KeyRange,
        reverse: bool,
        continuation: &Continuation,
        batch_size: usize,
        state: ExecuteState,
    ) -> Result<Self, CursorError> {
        let mut tail = CursorTail::Open;
        let last_key = match continuation {
            Continuation::End => {
                tail = CursorTail::Done(NoNextReason::SourceExhausted, Continuation::End);
                None
            }
            _ => decode_position::<KeyPosition>(continuation).map_err(CursorError::invalid_continuation)?.map(|p| p.last_key),
        };
        Ok(Self {
            store,
            range,
            reverse,
            batch_size: batch_size.max(1),
            buffer: VecDeque::new(),
            source_done: false,
            last_key,
            continuation: continuation.clone(),
            state,
            initial_pass: true,
            executor: Executor::current(),
            tail,
        })
    }

    /// The part of the range not yet returned
    fn remaining(&self) -> KeyRange {
        let Some(last_key) = &self.last_key else { return self.range.clone() };
        if self.reverse {
            let end = if last_key < &self.range.end { last_key.clone() } else { self.range.end.clone() };
            KeyRange::new(self.range.begin.clone(), end)
        } else {
            let mut after = last_key.clone();
            after.push(0x00);
            let begin = if after > self.range.begin { after } else { self.range.begin.clone() };
            KeyRange::new(begin, self.range.end.clone())
        }
    }

    async fn advance(&mut self) -> Result<CursorResult<KeyValue>, CursorError> {
        if self.buffer.is_empty() && !self.source_done {
            let remaining = self.remaining();
            let batch = self.store.scan(&remaining, self.reverse, self.batch_size).await?;
            tracing::trace!(fetched = batch.len(), reverse = self.reverse, "scanned key range batch");
            self.source_done = batch.len() < self.batch_size;
            self.buffer.extend(batch);
        }
        if self.buffer.is_empty() {
            return Ok(CursorResult::exhausted());
        }
        if std::mem::take(&mut self.initial_pass) {
            self.state.record_initial_scan();
        } else if !self.state.try_record_scan() {
            return Ok(CursorResult::stopped(NoNextReason::ScanLimitReached, self.continuation.clone()));
        }
        let Some((key, value)) = self.buffer.pop_front() else { return Ok(CursorResult::exhausted()) };
        self.continuation = encode_position(&KeyPosition { last_key: key.clone() }).map_err(CursorError::failure)?;
        self.last_key = Some(key.clone());
        Ok(CursorResult::next(KeyValue { key, value }, self.continuation.clone()))
    }
}

#[async_trait]
impl Cursor<KeyValue> for KeyValueCursor {
    async fn next(&mut self) -> Result<CursorResult<KeyValue>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = self.advance().await;
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.buffer.clear();
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}
