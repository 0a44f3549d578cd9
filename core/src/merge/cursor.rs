use std::cmp::Ordering;

use async_trait::async_trait;
use futures::future::try_join_all;
use strata_proto::{decode_position, encode_position, Continuation, MergePosition};
use tracing::{debug, trace};

use super::{leg::Leg, KeyFn};
use crate::{
    cursor::{BoxCursor, Cursor, CursorResult, CursorTail, EmptyCursor, NoNextReason},
    error::CursorError,
    task::Executor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOperation {
    Union,
    Intersection,
}

impl std::fmt::Display for SetOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetOperation::Union => write!(f, "union"),
            SetOperation::Intersection => write!(f, "intersection"),
        }
    }
}

/// Merges legs that are each ordered by the same comparison key.
///
/// Union emits one result per distinct key (the value of the first leg
/// holding it) and advances every leg tied at that key. Intersection only
/// emits keys that are at the front of every leg and is exhausted as soon as
/// any leg is. Either operation stops when a leg stops for a limit, since
/// continuing without it could emit keys out of order.
///
/// The continuation holds the plan hash and one continuation per leg.
pub struct MergeCursor<T> {
    operation: SetOperation,
    legs: Vec<Leg<T>>,
    key: KeyFn<T>,
    reverse: bool,
    plan_hash: u64,
    executor: Executor,
    tail: CursorTail,
}

impl<T: Send + 'static> MergeCursor<T> {
    /// `open_leg` is called once per leg with that leg's continuation; legs
    /// that had already run dry are not reopened.
    pub fn new(
        operation: SetOperation,
        leg_count: usize,
        mut open_leg: impl FnMut(usize, Continuation) -> Result<BoxCursor<T>, CursorError>,
        key: KeyFn<T>,
        reverse: bool,
        plan_hash: u64,
        continuation: &Continuation,
    ) -> Result<Self, CursorError> {
        let executor = Executor::current();
        if continuation.is_end() {
            let tail = CursorTail::Done(NoNextReason::SourceExhausted, Continuation::End);
            return Ok(Self { operation, legs: Vec::new(), key, reverse, plan_hash, executor, tail });
        }
        let leg_continuations = match decode_position::<MergePosition>(continuation).map_err(CursorError::invalid_continuation)? {
            None => vec![Continuation::Start; leg_count],
            Some(position) => {
                if position.plan_hash != plan_hash {
                    return Err(CursorError::invalid_argument("continuation belongs to a different plan")
                        .with_log_info("expected_plan_hash", plan_hash)
                        .with_log_info("actual_plan_hash", position.plan_hash));
                }
                let legs = position.legs().map_err(CursorError::invalid_continuation)?;
                if legs.len() != leg_count {
                    return Err(CursorError::invalid_argument("continuation has the wrong number of legs")
                        .with_log_info("expected", leg_count)
                        .with_log_info("actual", legs.len()));
                }
                legs
            }
        };
        let mut legs = Vec::with_capacity(leg_count);
        for (index, leg_continuation) in leg_continuations.into_iter().enumerate() {
            if leg_continuation.is_end() {
                legs.push(Leg::finished(Box::new(EmptyCursor::new())));
            } else {
                legs.push(Leg::new(open_leg(index, leg_continuation.clone())?, leg_continuation));
            }
        }
        debug!(%operation, legs = leg_count, reverse, "opened merge cursor");
        Ok(Self { operation, legs, key, reverse, plan_hash, executor, tail: CursorTail::Open })
    }

    fn compare(&self, left: &strata_proto::Tuple, right: &strata_proto::Tuple) -> Ordering {
        if self.reverse {
            right.cmp(left)
        } else {
            left.cmp(right)
        }
    }

    fn position(&self) -> Result<Continuation, CursorError> {
        let legs: Vec<Continuation> = self.legs.iter().map(|leg| leg.continuation.clone()).collect();
        encode_position(&MergePosition::new(self.plan_hash, &legs)).map_err(CursorError::failure)
    }

    async fn fill(&mut self) -> Result<(), CursorError> {
        let key = &self.key;
        try_join_all(self.legs.iter_mut().filter(|leg| leg.needs_fill()).map(|leg| leg.fill(key))).await?;
        Ok(())
    }

    fn limit_stop(&self) -> Option<NoNextReason> { self.legs.iter().find_map(|leg| leg.limit_reason()) }

    async fn next_union(&mut self) -> Result<CursorResult<T>, CursorError> {
        self.fill().await?;
        if let Some(reason) = self.limit_stop() {
            return Ok(CursorResult::stopped(reason, self.position()?));
        }
        let mut min: Option<strata_proto::Tuple> = None;
        for key in self.legs.iter().filter_map(|leg| leg.front_key()) {
            if min.as_ref().map_or(true, |current| self.compare(key, current) == Ordering::Less) {
                min = Some(key.clone());
            }
        }
        let Some(min) = min else { return Ok(CursorResult::exhausted()) };

        let mut emitted = None;
        for leg in self.legs.iter_mut() {
            if leg.front_key() == Some(&min) {
                let value = leg.consume();
                if emitted.is_none() {
                    emitted = value;
                }
            }
        }
        trace!(key = %min, "union emits");
        match emitted {
            Some(value) => Ok(CursorResult::next(value, self.position()?)),
            None => Ok(CursorResult::exhausted()),
        }
    }

    async fn next_intersection(&mut self) -> Result<CursorResult<T>, CursorError> {
        loop {
            self.fill().await?;
            if self.legs.iter().any(|leg| leg.is_exhausted()) {
                return Ok(CursorResult::exhausted());
            }
            if let Some(reason) = self.limit_stop() {
                return Ok(CursorResult::stopped(reason, self.position()?));
            }
            let mut max: Option<strata_proto::Tuple> = None;
            for key in self.legs.iter().filter_map(|leg| leg.front_key()) {
                if max.as_ref().map_or(true, |current| self.compare(key, current) == Ordering::Greater) {
                    max = Some(key.clone());
                }
            }
            let Some(max) = max else { return Ok(CursorResult::exhausted()) };

            if self.legs.iter().all(|leg| leg.front_key() == Some(&max)) {
                let mut first = None;
                for leg in self.legs.iter_mut() {
                    let value = leg.consume();
                    if first.is_none() {
                        first = value;
                    }
                }
                trace!(key = %max, "intersection emits");
                return match first {
                    Some(value) => Ok(CursorResult::next(value, self.position()?)),
                    None => Ok(CursorResult::exhausted()),
                };
            }
            // legs behind the running maximum cannot contribute their front
            for leg in self.legs.iter_mut() {
                if leg.front_key().is_some_and(|key| key != &max) {
                    leg.consume();
                }
            }
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Cursor<T> for MergeCursor<T> {
    async fn next(&mut self) -> Result<CursorResult<T>, CursorError> {
        if let Some(result) = self.tail.guard() {
            return result;
        }
        let result = match self.operation {
            SetOperation::Union => self.next_union().await,
            SetOperation::Intersection => self.next_intersection().await,
        };
        if result.as_ref().is_ok_and(|r| !r.has_next()) || result.is_err() {
            self.legs.iter_mut().for_each(|leg| leg.close());
        }
        self.tail.observe(result)
    }

    fn close(&mut self) {
        self.legs.iter_mut().for_each(|leg| leg.close());
        self.tail.close()
    }

    fn executor(&self) -> &Executor { &self.executor }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_proto::{tuple, Tuple};

    use super::*;
    use crate::cursor::{CursorExt, ListCursor};

    fn key_fn() -> KeyFn<i64> { Arc::new(|v: &i64| Ok(tuple![*v])) }

    fn merge(operation: SetOperation, legs: Vec<Vec<i64>>, reverse: bool, continuation: &Continuation) -> Result<MergeCursor<i64>, CursorError> {
        let count = legs.len();
        MergeCursor::new(operation, count, |i, c| Ok(ListCursor::new(legs[i].clone(), &c)?.boxed()), key_fn(), reverse, 42, continuation)
    }

    #[tokio::test]
    async fn test_union_suppresses_duplicates() -> Result<(), anyhow::Error> {
        let legs = vec![vec![1, 3, 5, 7], vec![2, 3, 6], vec![], vec![7, 8]];
        let (values, reason, continuation) = merge(SetOperation::Union, legs, false, &Continuation::Start)?.collect_all().await?;
        assert_eq!(values, vec![1, 2, 3, 5, 6, 7, 8]);
        assert_eq!(reason, NoNextReason::SourceExhausted);
        assert_eq!(continuation, Continuation::End);
        Ok(())
    }

    #[tokio::test]
    async fn test_intersection_in_reverse() -> Result<(), anyhow::Error> {
        let legs = vec![vec![9, 7, 5, 3, 1], vec![8, 7, 4, 3], vec![7, 6, 3, 2]];
        let (values, _, _) = merge(SetOperation::Intersection, legs, true, &Continuation::Start)?.collect_all().await?;
        assert_eq!(values, vec![7, 3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_intersection_with_empty_leg() -> Result<(), anyhow::Error> {
        let (values, reason, _) = merge(SetOperation::Intersection, vec![vec![1, 2], vec![]], false, &Continuation::Start)?.collect_all().await?;
        assert!(values.is_empty());
        assert_eq!(reason, NoNextReason::SourceExhausted);
        Ok(())
    }

    #[tokio::test]
    async fn test_resume_at_every_split() -> Result<(), anyhow::Error> {
        let legs = vec![vec![1, 2, 4, 6, 8, 9], vec![2, 3, 4, 8, 10], vec![4, 5, 8, 9]];
        for operation in [SetOperation::Union, SetOperation::Intersection] {
            let (expected, _, _) = merge(operation, legs.clone(), false, &Continuation::Start)?.collect_all().await?;
            for split in 1..expected.len() {
                let mut cursor = merge(operation, legs.clone(), false, &Continuation::Start)?;
                let mut seen = Vec::new();
                let mut continuation = Continuation::Start;
                for _ in 0..split {
                    let result = cursor.next().await?;
                    continuation = result.continuation().clone();
                    seen.extend(result.into_value());
                }
                cursor.close();
                let (rest, _, _) = merge(operation, legs.clone(), false, &continuation)?.collect_all().await?;
                seen.extend(rest);
                assert_eq!(seen, expected, "{operation} split {split}");
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_foreign_continuation_is_rejected() -> Result<(), anyhow::Error> {
        let legs = vec![vec![1, 2], vec![2, 3]];
        let mut cursor = merge(SetOperation::Union, legs.clone(), false, &Continuation::Start)?;
        let continuation = cursor.next().await?.continuation().clone();
        let count = legs.len();
        let result = MergeCursor::new(SetOperation::Union, count, |i, c| Ok(ListCursor::new(legs[i].clone(), &c)?.boxed()), key_fn(), false, 7, &continuation);
        assert!(result.err().is_some_and(|e| e.is_invalid_argument()));
        Ok(())
    }

    #[tokio::test]
    async fn test_leg_limit_stops_the_merge() -> Result<(), anyhow::Error> {
        use crate::scan::ScanProperties;
        let props = ScanProperties::new().with_limit(2);
        let legs: Vec<Vec<i64>> = vec![vec![1, 3, 5, 7], vec![2, 4, 6]];
        let open = |i: usize, c: Continuation| -> Result<BoxCursor<i64>, CursorError> {
            Ok(ListCursor::new(legs[i].clone(), &c)?.skip_then_limit(&props, &c).boxed())
        };
        let (values, reason, continuation) = MergeCursor::new(SetOperation::Union, 2, open, key_fn(), false, 1, &Continuation::Start)?.collect_all().await?;
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(reason, NoNextReason::ReturnLimitReached);

        let (rest, _, _) = MergeCursor::new(SetOperation::Union, 2, open, key_fn(), false, 1, &continuation)?.collect_all().await?;
        assert_eq!(rest, vec![4, 5, 6]);
        let merged: Vec<Tuple> = values.iter().chain(&rest).map(|v| tuple![*v]).collect();
        assert!(merged.windows(2).all(|w| w[0] < w[1]));
        Ok(())
    }
}
